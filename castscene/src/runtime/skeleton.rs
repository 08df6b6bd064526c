use glam::{Quat, Vec3};
use std::collections::HashMap;

use crate::host::{Progress, report};
use crate::math::quat_to_euler;
use crate::{HostError, NodeId, SceneHost, Skeleton, Transform};

pub const JOINT_GROUP_NAME: &str = "Joints";
pub const DEFAULT_BONE_NAME: &str = "CastBone";

#[derive(Clone, Debug, PartialEq)]
pub struct BonePlan {
    pub name: String,
    pub hash: u64,
    pub parent: Option<usize>,
    pub local_position: Option<Vec3>,
    pub local_rotation: Option<Quat>,
    pub scale: Option<Vec3>,
    pub segment_scale_compensate: Option<bool>,
}

/// Bone hierarchy with every parent link validated.
///
/// Parent indices that are out of range, point at the bone itself, or close a cycle
/// are dropped so the bone stays under the joint group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkeletonPlan {
    pub bones: Vec<BonePlan>,
    pub issues: Vec<String>,
}

impl SkeletonPlan {
    pub fn from_skeleton(skeleton: &Skeleton<'_>) -> Self {
        let source = skeleton.bones();
        let count = source.len();
        let mut issues = Vec::new();

        let mut bones: Vec<BonePlan> = source
            .iter()
            .enumerate()
            .map(|(i, bone)| {
                let name = bone.name().unwrap_or(DEFAULT_BONE_NAME).to_string();
                let parent = match bone.parent_index() {
                    index if index < 0 => None,
                    index if index as usize >= count => {
                        issues.push(format!(
                            "Bone {name} has out of range parent index {index}"
                        ));
                        None
                    }
                    index if index as usize == i => {
                        issues.push(format!("Bone {name} is its own parent"));
                        None
                    }
                    index => Some(index as usize),
                };
                BonePlan {
                    name,
                    hash: bone.hash(),
                    parent,
                    local_position: bone.local_position(),
                    local_rotation: bone.local_rotation(),
                    scale: bone.scale(),
                    segment_scale_compensate: bone.segment_scale_compensate(),
                }
            })
            .collect();

        for i in 0..count {
            let mut cursor = bones[i].parent;
            let mut steps = 0;
            while let Some(current) = cursor {
                if current == i {
                    issues.push(format!(
                        "Bone {} closes a parent cycle, attaching it to the joint group",
                        bones[i].name
                    ));
                    bones[i].parent = None;
                    break;
                }
                steps += 1;
                if steps > count {
                    break;
                }
                cursor = bones[current].parent;
            }
        }

        Self { bones, issues }
    }

    /// Builds the joints in three passes: create, parent, then pose.
    ///
    /// A bone the host refuses is reported and left out; its children stay under the joint
    /// group. Only failing to create the group itself is an error.
    pub fn apply(&self, host: &mut dyn SceneHost) -> Result<SkeletonInstance, HostError> {
        for issue in &self.issues {
            report(host, issue.clone());
        }

        let group = host.create_transform(JOINT_GROUP_NAME, None)?;
        Progress::begin(host, "Importing skeleton...", self.bones.len() * 3);

        let mut handles = Vec::with_capacity(self.bones.len());
        let mut kept = Vec::with_capacity(self.bones.len());
        let mut document = Vec::with_capacity(self.bones.len());
        let mut indexes = HashMap::with_capacity(self.bones.len());
        for (i, bone) in self.bones.iter().enumerate() {
            match host.create_joint(&bone.name, Some(group)) {
                Ok(handle) => {
                    document.push(Some(handles.len()));
                    indexes.insert(bone.hash, handles.len());
                    handles.push(handle);
                    kept.push(i);
                }
                Err(e) => {
                    report(host, format!("Unable to create bone {}: {e}", bone.name));
                    document.push(None);
                }
            }
            Progress::step(host);
        }

        let parents: Vec<Option<usize>> = kept
            .iter()
            .map(|&i| self.bones[i].parent.and_then(|parent| document[parent]))
            .collect();

        for (slot, &i) in kept.iter().enumerate() {
            let bone = &self.bones[i];
            match (bone.parent, parents[slot]) {
                (Some(_), Some(parent)) => {
                    if let Err(e) = host.set_parent(handles[slot], Some(handles[parent])) {
                        report(host, format!("Unable to parent bone {}: {e}", bone.name));
                    }
                }
                (Some(parent), None) => report(
                    host,
                    format!(
                        "Bone {} lost its parent {}, leaving it under {JOINT_GROUP_NAME}",
                        bone.name, self.bones[parent].name
                    ),
                ),
                (None, _) => {}
            }
            Progress::step(host);
        }

        let mut paths = Vec::with_capacity(kept.len());
        for (slot, &i) in kept.iter().enumerate() {
            let bone = &self.bones[i];
            let handle = handles[slot];
            paths.push(host.full_path(handle).unwrap_or_default());

            if let Some(enabled) = bone.segment_scale_compensate {
                if let Err(e) = host.set_segment_scale_compensate(handle, enabled) {
                    report(host, format!("Unable to set scale compensation on {}: {e}", bone.name));
                }
            }

            let mut transform = Transform::IDENTITY;
            if let Some(position) = bone.local_position {
                transform.translate = position;
                transform.rotate = quat_to_euler(bone.local_rotation.unwrap_or(Quat::IDENTITY));
            }
            if let Some(scale) = bone.scale {
                transform.scale = scale;
            }
            if let Err(e) = host.set_transform(handle, transform) {
                report(host, format!("Unable to pose bone {}: {e}", bone.name));
            }
            Progress::step(host);
        }
        Progress::end(host);

        log::debug!("built skeleton with {} of {} bones", handles.len(), self.bones.len());

        Ok(SkeletonInstance {
            group,
            handles,
            paths,
            parents,
            indexes,
            document,
        })
    }
}

/// Joints created for one model.
///
/// `handles`, `paths` and `parents` share one index space. It matches the document's bone
/// order unless the host refused a bone; `document` maps document bone indices into it.
#[derive(Clone, Debug, PartialEq)]
pub struct SkeletonInstance {
    pub group: NodeId,
    pub handles: Vec<NodeId>,
    pub paths: Vec<String>,
    pub parents: Vec<Option<usize>>,
    pub indexes: HashMap<u64, usize>,
    pub document: Vec<Option<usize>>,
}

impl SkeletonInstance {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn index_of(&self, hash: u64) -> Option<usize> {
        self.indexes.get(&hash).copied()
    }

    pub fn node_of(&self, hash: u64) -> Option<NodeId> {
        self.index_of(hash).map(|i| self.handles[i])
    }

    /// Joint built for the document bone at `index`, used by skin weight buffers.
    pub fn bone_node(&self, index: usize) -> Option<NodeId> {
        self.document
            .get(index)
            .copied()
            .flatten()
            .map(|i| self.handles[i])
    }
}
