use glam::Vec3;
use std::collections::HashMap;

use crate::host::{Progress, report};
use crate::{
    BlendShape, DEFAULT_SHADING_GROUP, Mesh, MeshGeometry, NodeId, SceneHost, SkeletonInstance,
    SkinningMethod, UvLayer, color_from_packed,
};

pub const DEFAULT_MESH_NAME: &str = "CastMesh";
pub const DEFAULT_UV_SET: &str = "map1";

/// Skin weights resolved against document bone indices.
#[derive(Clone, Debug, PartialEq)]
pub struct SkinPlan {
    /// Distinct influencing bones, ascending.
    pub bones: Vec<usize>,
    pub max_influence: u32,
    pub method: SkinningMethod,
    /// One vector per vertex, ordered like `bones`.
    pub weights: Vec<Vec<f32>>,
}

impl SkinPlan {
    /// Sums raw `(bone, weight)` slots per distinct bone.
    ///
    /// A vertex with a single possible influence gets exactly `1.0`. Weights are not
    /// normalized otherwise.
    pub fn from_buffers(
        vertex_count: usize,
        max_influence: u32,
        method: SkinningMethod,
        bone_buffer: &[u32],
        value_buffer: &[f32],
    ) -> Option<Self> {
        let influence = max_influence as usize;
        if influence == 0 || vertex_count == 0 {
            return None;
        }
        let slots = vertex_count * influence;
        if bone_buffer.len() < slots || value_buffer.len() < slots {
            return None;
        }

        let mut bones: Vec<usize> = bone_buffer[..slots].iter().map(|b| *b as usize).collect();
        bones.sort_unstable();
        bones.dedup();
        let remap: HashMap<usize, usize> = bones.iter().enumerate().map(|(i, b)| (*b, i)).collect();

        let weights = (0..vertex_count)
            .map(|vertex| {
                let mut accumulated = vec![0.0f32; bones.len()];
                if bones.len() == 1 {
                    accumulated[0] = 1.0;
                    return accumulated;
                }
                let base = vertex * influence;
                if influence == 1 {
                    accumulated[remap[&(bone_buffer[base] as usize)]] = 1.0;
                    return accumulated;
                }
                for slot in base..base + influence {
                    accumulated[remap[&(bone_buffer[slot] as usize)]] += value_buffer[slot];
                }
                accumulated
            })
            .collect();

        Some(Self {
            bones,
            max_influence,
            method,
            weights,
        })
    }
}

/// Everything needed to build one mesh, decoded from the document up front.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshPlan {
    pub name: String,
    pub hash: u64,
    pub geometry: MeshGeometry,
    pub degenerate_faces_removed: usize,
    pub normals: Option<Vec<Vec3>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub uv_layers: Vec<UvLayer>,
    pub material: Option<u64>,
    pub skin: Option<SkinPlan>,
    pub issues: Vec<String>,
}

impl MeshPlan {
    pub fn from_mesh(mesh: &Mesh<'_>) -> Self {
        let name = mesh.name().unwrap_or(DEFAULT_MESH_NAME).to_string();
        let mut issues = Vec::new();

        let positions: Vec<Vec3> = mesh
            .vertex_position_buffer()
            .unwrap_or_default()
            .iter()
            .map(|p| Vec3::from_array(*p))
            .collect();

        let mut raw_faces = mesh.face_buffer().unwrap_or_default();
        if raw_faces.len() % 3 != 0 {
            issues.push(format!(
                "Face buffer of {name} has {} trailing indices",
                raw_faces.len() % 3
            ));
            raw_faces.truncate(raw_faces.len() - raw_faces.len() % 3);
        }
        let (faces, degenerate_faces_removed) = strip_degenerate_faces(&raw_faces);

        let normals = mesh
            .vertex_normal_buffer()
            .map(|normals| normals.iter().map(|n| Vec3::from_array(*n)).collect());
        let colors = mesh
            .vertex_color_buffer()
            .map(|colors| colors.into_iter().map(color_from_packed).collect());

        let uv_layers = (0..mesh.uv_layer_count())
            .map(|i| {
                let layer = mesh.uv_layer_buffer(i).unwrap_or_default();
                face_corner_uvs(uv_layer_name(i), layer, &faces)
            })
            .collect();

        let skin = match mesh.maximum_weight_influence() {
            0 => None,
            max_influence => {
                let method = SkinningMethod::from_name(mesh.skinning_method()).unwrap_or_else(|| {
                    issues.push(format!(
                        "Unknown skinning method {} on {name}, using linear",
                        mesh.skinning_method()
                    ));
                    SkinningMethod::Linear
                });
                let plan = SkinPlan::from_buffers(
                    positions.len(),
                    max_influence,
                    method,
                    &mesh.weight_bone_buffer().unwrap_or_default(),
                    mesh.weight_value_buffer().unwrap_or_default(),
                );
                if plan.is_none() {
                    issues.push(format!("Skin weights of {name} are incomplete, skipping skin"));
                }
                plan
            }
        };

        Self {
            name,
            hash: mesh.hash(),
            geometry: MeshGeometry { positions, faces },
            degenerate_faces_removed,
            normals,
            colors,
            uv_layers,
            material: mesh.material(),
            skin,
            issues,
        }
    }

    /// Builds the mesh under `parent`, returning the shape node.
    pub fn apply(
        &self,
        host: &mut dyn SceneHost,
        parent: NodeId,
        skeleton: Option<&SkeletonInstance>,
        shading_groups: &HashMap<u64, String>,
        import_skin: bool,
    ) -> Option<NodeId> {
        for issue in &self.issues {
            report(host, issue.clone());
        }
        if self.degenerate_faces_removed > 0 {
            report(
                host,
                format!(
                    "Removed {} degenerate faces from {}",
                    self.degenerate_faces_removed, self.name
                ),
            );
        }

        let transform = match host.create_transform(&self.name, Some(parent)) {
            Ok(node) => node,
            Err(e) => {
                report(host, format!("Unable to create mesh {}: {e}", self.name));
                return None;
            }
        };
        let shape = match host.create_mesh(
            &format!("{}Shape", self.name),
            transform,
            self.geometry.clone(),
        ) {
            Ok(node) => node,
            Err(e) => {
                report(host, format!("Unable to create mesh {}: {e}", self.name));
                return None;
            }
        };

        if let Some(normals) = &self.normals {
            if let Err(e) = host.set_vertex_normals(shape, normals) {
                report(host, format!("Unable to set normals on {}: {e}", self.name));
            }
        }
        if let Some(colors) = &self.colors {
            if let Err(e) = host.set_vertex_colors(shape, colors) {
                report(host, format!("Unable to set colors on {}: {e}", self.name));
            }
        }

        let group = self
            .material
            .and_then(|hash| shading_groups.get(&hash))
            .map_or(DEFAULT_SHADING_GROUP, String::as_str);
        if let Err(e) = host.assign_shading_group(shape, group) {
            log::debug!("shading group {group} not assigned to {}: {e}", self.name);
        }

        for layer in &self.uv_layers {
            if let Err(e) = host.set_uv_layer(shape, layer.clone()) {
                report(host, format!("Unable to set uv set {} on {}: {e}", layer.name, self.name));
            }
        }

        if import_skin {
            if let (Some(skin), Some(skeleton)) = (&self.skin, skeleton) {
                self.bind_skin(host, shape, skin, skeleton);
            }
        }

        Some(shape)
    }

    fn bind_skin(
        &self,
        host: &mut dyn SceneHost,
        shape: NodeId,
        skin: &SkinPlan,
        skeleton: &SkeletonInstance,
    ) {
        let Some(bones) = skin
            .bones
            .iter()
            .map(|index| skeleton.bone_node(*index))
            .collect::<Option<Vec<NodeId>>>()
        else {
            report(host, format!("Skin of {} references missing bones", self.name));
            return;
        };

        let cluster = match host.create_skin(shape, &bones, skin.max_influence, skin.method) {
            Ok(cluster) => cluster,
            Err(e) => {
                report(host, format!("Unable to bind skin on {}: {e}", self.name));
                return;
            }
        };
        for (vertex, weights) in skin.weights.iter().enumerate() {
            if let Err(e) = host.set_skin_weights(cluster, vertex, weights) {
                report(host, format!("Unable to set weights on {}: {e}", self.name));
                return;
            }
        }
    }
}

pub fn uv_layer_name(index: usize) -> String {
    if index == 0 {
        DEFAULT_UV_SET.to_string()
    } else {
        format!("map{}", index + 1)
    }
}

/// Drops triangles that repeat a vertex index, returning the kept faces and the removal count.
pub fn strip_degenerate_faces(faces: &[u32]) -> (Vec<u32>, usize) {
    let mut kept = Vec::with_capacity(faces.len());
    let mut removed = 0;
    for face in faces.chunks_exact(3) {
        if face[0] == face[1] || face[0] == face[2] || face[1] == face[2] {
            removed += 1;
        } else {
            kept.extend_from_slice(face);
        }
    }
    (kept, removed)
}

/// Expands per-vertex UVs to one entry per face corner, flipping V.
pub fn face_corner_uvs(name: String, per_vertex: &[[f32; 2]], faces: &[u32]) -> UvLayer {
    let (u, v) = faces
        .iter()
        .map(|index| {
            let [u, v] = per_vertex.get(*index as usize).copied().unwrap_or_default();
            (u, 1.0 - v)
        })
        .unzip();
    UvLayer { name, u, v }
}

/// Wires blend shapes between already-built meshes, keyed by document mesh hash.
pub fn import_blend_shapes(
    host: &mut dyn SceneHost,
    blend_shapes: &[BlendShape<'_>],
    shapes: &HashMap<u64, NodeId>,
) {
    Progress::begin(host, "Importing shapes...", blend_shapes.len());
    for blend_shape in blend_shapes {
        Progress::step(host);

        let Some(base) = blend_shape.base_shape().and_then(|h| shapes.get(&h)) else {
            continue;
        };
        let Some(target_hashes) = blend_shape.target_shapes() else {
            continue;
        };
        let scales = blend_shape.target_weight_scales().unwrap_or_default();
        let targets: Vec<(NodeId, f32)> = target_hashes
            .iter()
            .enumerate()
            .filter_map(|(i, h)| {
                let node = shapes.get(h).copied()?;
                Some((node, scales.get(i).copied().unwrap_or(1.0)))
            })
            .collect();
        if targets.is_empty() {
            continue;
        }

        if let Err(e) = host.create_blend_shape(blend_shape.name(), *base, &targets) {
            report(host, format!("Unable to create blend shape: {e}"));
            continue;
        }
        for (target, _) in &targets {
            let Some(container) = host.parent(*target) else {
                continue;
            };
            if let Err(e) = host.set_visibility(container, false) {
                report(host, format!("Unable to hide blend shape target: {e}"));
            }
        }
    }
    Progress::end(host);
}
