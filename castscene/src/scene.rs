//! Arena-backed `SceneHost` used by tests, the demo, and headless conversions.

use glam::{Quat, Vec3};
use std::collections::HashMap;

use crate::{
    Channel, ConstraintKind, ConstraintOptions, CurveId, DEFAULT_SHADING_GROUP, HostError,
    MaterialDesc, MeshGeometry, NodeId, NodeType, PlaybackMode, PlaybackState,
    RotationInterpolation, SceneHost, SkinId, SkinningMethod, TangentType, TimeUnit, Transform,
    UvLayer,
};

/// Separates names in a full node path; node names may not contain it.
pub const PATH_SEPARATOR: char = '|';

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub node_type: NodeType,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: Transform,
    pub joint_orient: Quat,
    pub segment_scale_compensate: bool,
    pub visible: bool,
}

impl SceneNode {
    fn new(name: &str, node_type: NodeType, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            node_type,
            parent,
            children: Vec::new(),
            transform: Transform::IDENTITY,
            joint_orient: Quat::IDENTITY,
            segment_scale_compensate: true,
            visible: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub geometry: MeshGeometry,
    pub normals: Vec<Vec3>,
    pub colors: Vec<[f32; 4]>,
    pub uv_layers: Vec<UvLayer>,
    pub shading_group: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SkinData {
    pub mesh: NodeId,
    pub bones: Vec<NodeId>,
    pub max_influence: u32,
    pub method: SkinningMethod,
    /// Per vertex, ordered like `bones`.
    pub weights: Vec<Vec<f32>>,
}

#[derive(Clone, Debug)]
pub struct BlendShapeData {
    pub node: NodeId,
    pub base: NodeId,
    pub targets: Vec<(NodeId, f32)>,
}

#[derive(Clone, Debug)]
pub struct IkHandleData {
    pub node: NodeId,
    pub start: NodeId,
    pub end: NodeId,
    pub pole_vector_source: Option<NodeId>,
    pub twist_source: Option<NodeId>,
}

#[derive(Clone, Debug)]
pub struct ConstraintData {
    pub node: NodeId,
    pub kind: ConstraintKind,
    pub target: NodeId,
    pub constrained: NodeId,
    pub options: ConstraintOptions,
}

#[derive(Clone, Debug)]
pub struct AnimCurve {
    pub node: NodeId,
    pub channel: Channel,
    /// Sorted by frame, at most one key per frame.
    pub keys: Vec<(f64, f64, TangentType)>,
    pub interpolation: RotationInterpolation,
}

impl AnimCurve {
    /// Linear between keys, stepped keys hold until the next key, clamped outside the range.
    fn evaluate(&self, frame: f64) -> Option<f64> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;
        if frame <= first.0 {
            return Some(first.1);
        }
        if frame >= last.0 {
            return Some(last.1);
        }
        let next = self.keys.partition_point(|k| k.0 <= frame);
        let (f0, v0, tangent) = self.keys[next - 1];
        let (f1, v1, _) = self.keys[next];
        if tangent == TangentType::Stepped || f1 <= f0 {
            return Some(v0);
        }
        Some(crate::math::lerp(v0, v1, (frame - f0) / (f1 - f0)))
    }

    fn insert(&mut self, frame: f64, value: f64, tangent: TangentType) {
        match self
            .keys
            .binary_search_by(|k| k.0.total_cmp(&frame))
        {
            Ok(i) => self.keys[i] = (frame, value, tangent),
            Err(i) => self.keys.insert(i, (frame, value, tangent)),
        }
    }
}

/// A self-contained scene graph.
#[derive(Clone, Debug, Default)]
pub struct MemoryScene {
    nodes: Vec<SceneNode>,
    meshes: HashMap<NodeId, MeshData>,
    materials: Vec<MaterialDesc>,
    shading_groups: Vec<String>,
    skins: Vec<SkinData>,
    blend_shapes: Vec<BlendShapeData>,
    ik_handles: Vec<IkHandleData>,
    constraints: Vec<ConstraintData>,
    curves: Vec<Option<AnimCurve>>,
    instances: HashMap<NodeId, NodeId>,
    playback: PlaybackState,
    notification_data: Option<String>,
    warnings: Vec<String>,
    progress_steps: usize,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self {
            shading_groups: vec![DEFAULT_SHADING_GROUP.to_string()],
            ..Self::default()
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn mesh(&self, id: NodeId) -> Option<&MeshData> {
        self.meshes.get(&id)
    }

    pub fn materials(&self) -> &[MaterialDesc] {
        &self.materials
    }

    pub fn skin(&self, id: SkinId) -> Option<&SkinData> {
        self.skins.get(id.0 as usize)
    }

    pub fn skins(&self) -> &[SkinData] {
        &self.skins
    }

    pub fn blend_shapes(&self) -> &[BlendShapeData] {
        &self.blend_shapes
    }

    pub fn ik_handles(&self) -> &[IkHandleData] {
        &self.ik_handles
    }

    pub fn constraints(&self) -> &[ConstraintData] {
        &self.constraints
    }

    pub fn curve(&self, id: CurveId) -> Option<&AnimCurve> {
        self.curves.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn curves(&self) -> impl Iterator<Item = &AnimCurve> {
        self.curves.iter().flatten()
    }

    pub fn instance_source(&self, instance: NodeId) -> Option<NodeId> {
        self.instances.get(&instance).copied()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn progress_steps(&self) -> usize {
        self.progress_steps
    }

    fn node_ref(&self, id: NodeId) -> Result<&SceneNode, HostError> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(HostError::InvalidNode { id: id.0 })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, HostError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(HostError::InvalidNode { id: id.0 })
    }

    fn curve_mut(&mut self, id: CurveId) -> Result<&mut AnimCurve, HostError> {
        self.curves
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(HostError::InvalidCurve { id: id.0 })
    }

    fn add_node(
        &mut self,
        name: &str,
        node_type: NodeType,
        parent: Option<NodeId>,
    ) -> Result<NodeId, HostError> {
        if name.contains(PATH_SEPARATOR) {
            return Err(HostError::InvalidOperation {
                message: format!("node name '{name}' contains '{PATH_SEPARATOR}'"),
            });
        }
        if let Some(parent) = parent {
            self.node_ref(parent)?;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SceneNode::new(name, node_type, parent));
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.push(id);
        }
        Ok(id)
    }

    fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| NodeId(i as u32))
    }
}

impl SceneHost for MemoryScene {
    fn create_transform(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, HostError> {
        self.add_node(name, NodeType::Transform, parent)
    }

    fn create_joint(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, HostError> {
        self.add_node(name, NodeType::Joint, parent)
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), HostError> {
        self.node_ref(node)?;
        if let Some(parent) = parent {
            self.node_ref(parent)?;
            let mut cursor = Some(parent);
            while let Some(current) = cursor {
                if current == node {
                    return Err(HostError::InvalidParent {
                        child: self.full_path(node).unwrap_or_default(),
                        parent: self.full_path(parent).unwrap_or_default(),
                        reason: "would create a cycle".to_string(),
                    });
                }
                cursor = self.node_ref(current)?.parent;
            }
        }

        if let Some(old) = self.node_ref(node)?.parent {
            self.node_mut(old)?.children.retain(|c| *c != node);
        }
        self.node_mut(node)?.parent = parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.push(node);
        }
        Ok(())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn children(&self, node: Option<NodeId>) -> Vec<NodeId> {
        match node {
            Some(node) => self.node(node).map(|n| n.children.clone()).unwrap_or_default(),
            None => self.roots().collect(),
        }
    }

    fn node_name(&self, node: NodeId) -> Option<String> {
        self.node(node).map(|n| n.name.clone())
    }

    fn node_type(&self, node: NodeId) -> Option<NodeType> {
        self.node(node).map(|n| n.node_type)
    }

    fn full_path(&self, node: NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            let n = self.node(current)?;
            segments.push(n.name.as_str());
            cursor = n.parent;
        }
        segments.reverse();
        Some(format!("|{}", segments.join("|")))
    }

    fn find_node(&self, name: &str) -> Result<Option<NodeId>, HostError> {
        let candidates: Vec<NodeId> = if name.starts_with(PATH_SEPARATOR) {
            (0..self.nodes.len() as u32)
                .map(NodeId)
                .filter(|id| self.full_path(*id).as_deref() == Some(name))
                .collect()
        } else {
            self.nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.name == name)
                .map(|(i, _)| NodeId(i as u32))
                .collect()
        };
        match candidates.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => Err(HostError::NameConflict {
                name: name.to_string(),
            }),
        }
    }

    fn nodes_of_type(&self, node_type: NodeType) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.node_type == node_type)
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    fn transform(&self, node: NodeId) -> Result<Transform, HostError> {
        Ok(self.node_ref(node)?.transform)
    }

    fn set_transform(&mut self, node: NodeId, transform: Transform) -> Result<(), HostError> {
        self.node_mut(node)?.transform = transform;
        Ok(())
    }

    fn joint_orient(&self, node: NodeId) -> Result<Quat, HostError> {
        Ok(self.node_ref(node)?.joint_orient)
    }

    fn set_joint_orient(&mut self, node: NodeId, orient: Quat) -> Result<(), HostError> {
        let n = self.node_mut(node)?;
        if n.node_type != NodeType::Joint {
            return Err(HostError::InvalidOperation {
                message: format!("'{}' is not a joint", n.name),
            });
        }
        n.joint_orient = orient;
        Ok(())
    }

    fn segment_scale_compensate(&self, node: NodeId) -> Result<bool, HostError> {
        Ok(self.node_ref(node)?.segment_scale_compensate)
    }

    fn set_segment_scale_compensate(
        &mut self,
        node: NodeId,
        enabled: bool,
    ) -> Result<(), HostError> {
        self.node_mut(node)?.segment_scale_compensate = enabled;
        Ok(())
    }

    fn set_visibility(&mut self, node: NodeId, visible: bool) -> Result<(), HostError> {
        self.node_mut(node)?.visible = visible;
        Ok(())
    }

    fn create_mesh(
        &mut self,
        name: &str,
        parent: NodeId,
        geometry: MeshGeometry,
    ) -> Result<NodeId, HostError> {
        if geometry.faces.len() % 3 != 0 {
            return Err(HostError::InvalidOperation {
                message: format!("face buffer of '{name}' is not a triangle list"),
            });
        }
        if let Some(index) = geometry
            .faces
            .iter()
            .find(|i| **i as usize >= geometry.positions.len())
        {
            return Err(HostError::InvalidOperation {
                message: format!("face index {index} of '{name}' is out of range"),
            });
        }
        let id = self.add_node(name, NodeType::Mesh, Some(parent))?;
        self.meshes.insert(
            id,
            MeshData {
                geometry,
                ..MeshData::default()
            },
        );
        Ok(id)
    }

    fn set_vertex_normals(&mut self, mesh: NodeId, normals: &[Vec3]) -> Result<(), HostError> {
        let data = self
            .meshes
            .get_mut(&mesh)
            .ok_or(HostError::InvalidNode { id: mesh.0 })?;
        data.normals = normals.to_vec();
        Ok(())
    }

    fn set_vertex_colors(&mut self, mesh: NodeId, colors: &[[f32; 4]]) -> Result<(), HostError> {
        let data = self
            .meshes
            .get_mut(&mesh)
            .ok_or(HostError::InvalidNode { id: mesh.0 })?;
        data.colors = colors.to_vec();
        Ok(())
    }

    fn set_uv_layer(&mut self, mesh: NodeId, layer: UvLayer) -> Result<(), HostError> {
        let data = self
            .meshes
            .get_mut(&mesh)
            .ok_or(HostError::InvalidNode { id: mesh.0 })?;
        match data.uv_layers.iter_mut().find(|l| l.name == layer.name) {
            Some(existing) => *existing = layer,
            None => data.uv_layers.push(layer),
        }
        Ok(())
    }

    fn has_shading_group(&self, name: &str) -> bool {
        self.shading_groups.iter().any(|g| g == name)
    }

    fn create_material(&mut self, material: &MaterialDesc) -> Result<String, HostError> {
        let group = MaterialDesc::shading_group_name(&material.name);
        if self.has_shading_group(&group) {
            return Err(HostError::InvalidOperation {
                message: format!("shading group '{group}' already exists"),
            });
        }
        self.materials.push(material.clone());
        self.shading_groups.push(group.clone());
        Ok(group)
    }

    fn assign_shading_group(&mut self, mesh: NodeId, group: &str) -> Result<(), HostError> {
        if !self.has_shading_group(group) {
            return Err(HostError::MissingNode {
                name: group.to_string(),
            });
        }
        let data = self
            .meshes
            .get_mut(&mesh)
            .ok_or(HostError::InvalidNode { id: mesh.0 })?;
        data.shading_group = Some(group.to_string());
        Ok(())
    }

    fn create_skin(
        &mut self,
        mesh: NodeId,
        bones: &[NodeId],
        max_influence: u32,
        method: SkinningMethod,
    ) -> Result<SkinId, HostError> {
        let vertex_count = self
            .meshes
            .get(&mesh)
            .ok_or(HostError::InvalidNode { id: mesh.0 })?
            .geometry
            .positions
            .len();
        for bone in bones {
            self.node_ref(*bone)?;
        }
        let id = SkinId(self.skins.len() as u32);
        self.skins.push(SkinData {
            mesh,
            bones: bones.to_vec(),
            max_influence,
            method,
            weights: vec![vec![0.0; bones.len()]; vertex_count],
        });
        Ok(id)
    }

    fn set_skin_weights(
        &mut self,
        skin: SkinId,
        vertex: usize,
        weights: &[f32],
    ) -> Result<(), HostError> {
        let data = self
            .skins
            .get_mut(skin.0 as usize)
            .ok_or(HostError::InvalidOperation {
                message: format!("unknown skin {}", skin.0),
            })?;
        let bone_count = data.bones.len();
        let slot = data
            .weights
            .get_mut(vertex)
            .ok_or(HostError::InvalidOperation {
                message: format!("vertex {vertex} is out of range"),
            })?;
        if weights.len() > bone_count {
            return Err(HostError::InvalidOperation {
                message: format!("{} weights for {bone_count} bones", weights.len()),
            });
        }
        slot.fill(0.0);
        slot[..weights.len()].copy_from_slice(weights);
        Ok(())
    }

    fn create_blend_shape(
        &mut self,
        name: Option<&str>,
        base: NodeId,
        targets: &[(NodeId, f32)],
    ) -> Result<NodeId, HostError> {
        if !self.meshes.contains_key(&base) {
            return Err(HostError::InvalidNode { id: base.0 });
        }
        for (target, _) in targets {
            if !self.meshes.contains_key(target) {
                return Err(HostError::InvalidNode { id: target.0 });
            }
        }
        let node = self.add_node(name.unwrap_or("blendShape"), NodeType::BlendShape, None)?;
        self.blend_shapes.push(BlendShapeData {
            node,
            base,
            targets: targets.to_vec(),
        });
        Ok(node)
    }

    fn create_ik_handle(
        &mut self,
        name: &str,
        start: NodeId,
        end: NodeId,
    ) -> Result<NodeId, HostError> {
        self.node_ref(start)?;
        self.node_ref(end)?;
        let node = self.add_node(name, NodeType::IkHandle, None)?;
        self.ik_handles.push(IkHandleData {
            node,
            start,
            end,
            pole_vector_source: None,
            twist_source: None,
        });
        Ok(node)
    }

    fn connect_pole_vector(&mut self, handle: NodeId, source: NodeId) -> Result<(), HostError> {
        self.node_ref(source)?;
        let data = self
            .ik_handles
            .iter_mut()
            .find(|h| h.node == handle)
            .ok_or(HostError::InvalidNode { id: handle.0 })?;
        data.pole_vector_source = Some(source);
        Ok(())
    }

    fn connect_twist(&mut self, handle: NodeId, source: NodeId) -> Result<(), HostError> {
        self.node_ref(source)?;
        let data = self
            .ik_handles
            .iter_mut()
            .find(|h| h.node == handle)
            .ok_or(HostError::InvalidNode { id: handle.0 })?;
        data.twist_source = Some(source);
        Ok(())
    }

    fn create_constraint(
        &mut self,
        kind: ConstraintKind,
        target: NodeId,
        constrained: NodeId,
        options: &ConstraintOptions,
    ) -> Result<NodeId, HostError> {
        self.node_ref(target)?;
        self.node_ref(constrained)?;
        let node = self.add_node(&options.name, NodeType::Constraint, Some(constrained))?;
        self.constraints.push(ConstraintData {
            node,
            kind,
            target,
            constrained,
            options: options.clone(),
        });
        Ok(node)
    }

    fn set_auto_key(&mut self, enabled: bool) {
        self.playback.auto_key = enabled;
    }

    fn find_curve(&self, node: NodeId, channel: Channel) -> Option<CurveId> {
        self.curves
            .iter()
            .position(|c| {
                c.as_ref()
                    .is_some_and(|c| c.node == node && c.channel == channel)
            })
            .map(|i| CurveId(i as u32))
    }

    fn create_curve(&mut self, node: NodeId, channel: Channel) -> Result<CurveId, HostError> {
        self.node_ref(node)?;
        if self.find_curve(node, channel).is_some() {
            return Err(HostError::InvalidOperation {
                message: format!(
                    "'{}' already has a {} curve",
                    self.full_path(node).unwrap_or_default(),
                    channel.attribute_name()
                ),
            });
        }
        let id = CurveId(self.curves.len() as u32);
        self.curves.push(Some(AnimCurve {
            node,
            channel,
            keys: Vec::new(),
            interpolation: RotationInterpolation::None,
        }));
        Ok(id)
    }

    fn evaluate_curve(&self, curve: CurveId, frame: f64) -> Result<f64, HostError> {
        let data = self
            .curve(curve)
            .ok_or(HostError::InvalidCurve { id: curve.0 })?;
        match data.evaluate(frame) {
            Some(value) => Ok(value),
            None => self.static_value(data.node, data.channel),
        }
    }

    fn add_keys(
        &mut self,
        curve: CurveId,
        frames: &[f64],
        values: &[f64],
        tangent: TangentType,
    ) -> Result<(), HostError> {
        if frames.len() != values.len() {
            return Err(HostError::InvalidOperation {
                message: format!("{} frames for {} values", frames.len(), values.len()),
            });
        }
        let data = self.curve_mut(curve)?;
        for (frame, value) in frames.iter().zip(values) {
            data.insert(*frame, *value, tangent);
        }
        Ok(())
    }

    fn curve_interpolation(&self, curve: CurveId) -> RotationInterpolation {
        self.curve(curve)
            .map(|c| c.interpolation)
            .unwrap_or_default()
    }

    fn set_curve_interpolation(
        &mut self,
        curve: CurveId,
        mode: RotationInterpolation,
    ) -> Result<(), HostError> {
        self.curve_mut(curve)?.interpolation = mode;
        Ok(())
    }

    fn keyed_frames(&self, node: NodeId, channel: Channel) -> Vec<f64> {
        self.find_curve(node, channel)
            .and_then(|id| self.curve(id))
            .map(|c| c.keys.iter().map(|k| k.0).collect())
            .unwrap_or_default()
    }

    fn sample_channel(&self, node: NodeId, channel: Channel, frame: f64) -> Result<f64, HostError> {
        match self.find_curve(node, channel) {
            Some(curve) => self.evaluate_curve(curve, frame),
            None => self.static_value(node, channel),
        }
    }

    fn delete_all_curves(&mut self) {
        self.curves.iter_mut().for_each(|c| *c = None);
    }

    fn playback(&self) -> PlaybackState {
        self.playback
    }

    fn set_playback_mode(&mut self, mode: PlaybackMode) {
        self.playback.mode = mode;
    }

    fn set_time_unit(&mut self, unit: TimeUnit) {
        self.playback.unit = unit;
    }

    fn set_playback_range(&mut self, start: f64, end: f64) {
        self.playback.start = start;
        self.playback.end = end;
    }

    fn set_current_time(&mut self, frame: f64) {
        self.playback.current = frame;
    }

    fn create_instance(&mut self, source: NodeId, name: &str) -> Result<NodeId, HostError> {
        self.node_ref(source)?;
        let node = self.add_node(name, NodeType::Instance, None)?;
        self.instances.insert(node, source);
        Ok(node)
    }

    fn notification_data(&self) -> Option<String> {
        self.notification_data.clone()
    }

    fn set_notification_data(&mut self, data: &str) -> Result<(), HostError> {
        self.notification_data = Some(data.to_string());
        Ok(())
    }

    fn clear_notification_data(&mut self) {
        self.notification_data = None;
    }

    fn step_progress(&mut self) -> Result<(), HostError> {
        self.progress_steps += 1;
        Ok(())
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

impl MemoryScene {
    fn static_value(&self, node: NodeId, channel: Channel) -> Result<f64, HostError> {
        let n = self.node_ref(node)?;
        Ok(match channel {
            Channel::Visibility => f64::from(u8::from(n.visible)),
            _ => n.transform.channel(channel).unwrap_or_default(),
        })
    }
}
