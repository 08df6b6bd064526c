use glam::{Quat, Vec3};
use std::collections::{BTreeSet, HashMap};

use crate::host::{Progress, report};
use crate::math::{compose, euler_to_quat};
use crate::{
    Channel, CurveProperty, NodeId, PlaybackMode, RootMut, SceneHost, Session, Transform,
};

const SIMPLE_PROPERTIES: [(Channel, CurveProperty); 6] = [
    (Channel::TranslateX, CurveProperty::TranslateX),
    (Channel::TranslateY, CurveProperty::TranslateY),
    (Channel::TranslateZ, CurveProperty::TranslateZ),
    (Channel::ScaleX, CurveProperty::ScaleX),
    (Channel::ScaleY, CurveProperty::ScaleY),
    (Channel::ScaleZ, CurveProperty::ScaleZ),
];

/// One object property with keys worth exporting.
#[derive(Clone, Debug, PartialEq)]
pub struct Exportable {
    pub node: NodeId,
    pub property: CurveProperty,
    pub frames: BTreeSet<i32>,
}

fn rounded_frames(host: &dyn SceneHost, node: NodeId, channel: Channel) -> BTreeSet<i32> {
    host.keyed_frames(node, channel)
        .into_iter()
        .map(|frame| frame as i32)
        .collect()
}

/// Lists the keyed properties of `objects`. Rotation axes are merged into one entry.
pub fn collect_exportables(host: &dyn SceneHost, objects: &[NodeId]) -> Vec<Exportable> {
    let mut exportables = Vec::new();
    for node in objects {
        for (channel, property) in SIMPLE_PROPERTIES {
            let frames = rounded_frames(host, *node, channel);
            if !frames.is_empty() {
                exportables.push(Exportable {
                    node: *node,
                    property,
                    frames,
                });
            }
        }

        let frames: BTreeSet<i32> = Channel::ROTATION
            .iter()
            .flat_map(|channel| rounded_frames(host, *node, *channel))
            .collect();
        if !frames.is_empty() {
            exportables.push(Exportable {
                node: *node,
                property: CurveProperty::RotationQuaternion,
                frames,
            });
        }
    }
    exportables
}

/// Combined rotate and joint orient of `node` at `frame`.
pub fn sample_rotation(host: &dyn SceneHost, node: NodeId, frame: f64) -> Quat {
    let mut euler = [0.0f32; 3];
    for (axis, channel) in Channel::ROTATION.iter().enumerate() {
        euler[axis] = host.sample_channel(node, *channel, frame).unwrap_or_default() as f32;
    }
    let orient = host.joint_orient(node).unwrap_or(Quat::IDENTITY);
    compose(euler_to_quat(Vec3::from_array(euler)), orient)
}

/// Writes one absolute curve per keyed property plus the session's notifications.
pub fn export_animation(
    host: &mut dyn SceneHost,
    session: &mut Session,
    root: &mut RootMut<'_>,
    objects: &[NodeId],
) {
    let playback = host.playback();
    let start = playback.start as i32;
    let end = playback.end as i32;

    let exportables = collect_exportables(host, objects);
    let mut animation = root.create_animation();
    animation
        .set_framerate(playback.unit.fps())
        .set_looping(playback.mode == PlaybackMode::Loop);

    Progress::begin(host, "Exporting animation...", exportables.len());
    for exportable in exportables {
        Progress::step(host);

        let mut frames = exportable.frames;
        frames.insert(start);
        let frames: Vec<u32> = frames
            .iter()
            .filter(|frame| (start..=end).contains(*frame))
            .filter_map(|frame| u32::try_from(*frame).ok())
            .collect();
        if frames.is_empty() {
            continue;
        }
        let Some(node_name) = host.node_name(exportable.node) else {
            continue;
        };

        let mut curve = animation.create_curve();
        curve
            .set_node_name(&node_name)
            .set_key_property_name(exportable.property.key())
            .set_mode("absolute")
            .set_key_frame_buffer(&frames);

        let scene: &dyn SceneHost = &*host;
        match exportable.property {
            CurveProperty::RotationQuaternion => {
                let values = frames
                    .iter()
                    .map(|frame| {
                        sample_rotation(scene, exportable.node, f64::from(*frame)).to_array()
                    })
                    .collect();
                curve.set_vec4_key_value_buffer(values);
            }
            property => {
                let channel = property.channels()[0];
                let values = frames
                    .iter()
                    .map(|frame| {
                        scene
                            .sample_channel(exportable.node, channel, f64::from(*frame))
                            .unwrap_or_default() as f32
                    })
                    .collect();
                curve.set_float_key_value_buffer(values);
            }
        }
    }
    Progress::end(host);

    if let Err(e) = session.notifications.load_from(host) {
        report(host, format!("Unable to read scene notifications: {e}"));
    }
    for (name, frames) in session.notifications.tracks() {
        let frames: Vec<u32> = frames
            .iter()
            .filter_map(|frame| u32::try_from(*frame).ok())
            .collect();
        let mut track = animation.create_notification();
        track.set_name(name);
        track.set_key_frame_buffer(&frames);
    }
}

/// Local joint transform as stored on a document bone.
pub fn joint_local_pose(host: &dyn SceneHost, node: NodeId) -> Option<(Transform, Quat)> {
    let transform = host.transform(node).ok()?;
    let orient = host.joint_orient(node).unwrap_or(Quat::IDENTITY);
    Some((transform, compose(transform.rotation(), orient)))
}

/// Writes the given joints as a model skeleton. Parents outside `joints` make a bone a root.
pub fn export_model(host: &mut dyn SceneHost, root: &mut RootMut<'_>, joints: &[NodeId]) {
    let mut poses = Vec::with_capacity(joints.len());
    for joint in joints {
        match joint_local_pose(host, *joint) {
            Some((transform, rotation)) => poses.push((*joint, transform, rotation)),
            None => report(host, format!("Unable to export missing joint {joint:?}")),
        }
    }
    let indexes: HashMap<NodeId, usize> =
        poses.iter().enumerate().map(|(i, pose)| (pose.0, i)).collect();

    let mut model = root.create_model();
    let mut skeleton = model.create_skeleton();
    for (joint, transform, rotation) in poses {
        let parent = host
            .parent(joint)
            .and_then(|p| indexes.get(&p))
            .map_or(-1, |i| *i as i32);

        let mut bone = skeleton.create_bone();
        bone.set_name(&host.node_name(joint).unwrap_or_default())
            .set_parent_index(parent)
            .set_local_position(transform.translate)
            .set_local_rotation(rotation)
            .set_scale(transform.scale)
            .set_segment_scale_compensate(host.segment_scale_compensate(joint).unwrap_or(true));
    }
}
