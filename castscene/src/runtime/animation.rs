use glam::{Quat, Vec3};

use crate::host::{Progress, report};
use crate::math::{compose, euler_to_quat, lerp, quat_to_euler, slerp};
use crate::{
    Animation, Channel, Curve, CurveId, HostError, NodeId, NotificationTrack, PlaybackMode,
    RestPoseCache, RotationInterpolation, SceneHost, Session, TangentType, TimeUnit, Transform,
};

/// The animatable properties a document curve may address.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CurveProperty {
    RotationQuaternion,
    TranslateX,
    TranslateY,
    TranslateZ,
    ScaleX,
    ScaleY,
    ScaleZ,
    Visibility,
}

impl CurveProperty {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "rq" => Some(Self::RotationQuaternion),
            "tx" => Some(Self::TranslateX),
            "ty" => Some(Self::TranslateY),
            "tz" => Some(Self::TranslateZ),
            "sx" => Some(Self::ScaleX),
            "sy" => Some(Self::ScaleY),
            "sz" => Some(Self::ScaleZ),
            "vb" => Some(Self::Visibility),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::RotationQuaternion => "rq",
            Self::TranslateX => "tx",
            Self::TranslateY => "ty",
            Self::TranslateZ => "tz",
            Self::ScaleX => "sx",
            Self::ScaleY => "sy",
            Self::ScaleZ => "sz",
            Self::Visibility => "vb",
        }
    }

    /// Scene channels the property is keyed onto.
    pub fn channels(self) -> &'static [Channel] {
        match self {
            Self::RotationQuaternion => &Channel::ROTATION,
            Self::TranslateX => &[Channel::TranslateX],
            Self::TranslateY => &[Channel::TranslateY],
            Self::TranslateZ => &[Channel::TranslateZ],
            Self::ScaleX => &[Channel::ScaleX],
            Self::ScaleY => &[Channel::ScaleY],
            Self::ScaleZ => &[Channel::ScaleZ],
            Self::Visibility => &[Channel::Visibility],
        }
    }

    fn scalar_channel(self) -> Option<Channel> {
        match self {
            Self::RotationQuaternion => None,
            other => other.channels().first().copied(),
        }
    }
}

/// How imported key values combine with what is already in the scene.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum BlendMode {
    #[default]
    Absolute,
    Additive,
    Relative,
}

impl BlendMode {
    /// A missing mode means absolute. Unknown names yield `None`.
    pub fn from_name(name: Option<&str>) -> Option<Self> {
        match name {
            None | Some("absolute") => Some(Self::Absolute),
            Some("additive") => Some(Self::Additive),
            Some("relative") => Some(Self::Relative),
            Some(_) => None,
        }
    }
}

/// Smallest and largest imported frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameRange {
    pub smallest: Option<f64>,
    pub largest: f64,
}

impl Default for FrameRange {
    fn default() -> Self {
        Self {
            smallest: None,
            largest: 1.0,
        }
    }
}

impl FrameRange {
    pub fn include(&mut self, frame: f64) {
        self.smallest = Some(self.smallest.map_or(frame, |s| s.min(frame)));
        self.largest = self.largest.max(frame);
    }

    pub fn start(&self) -> f64 {
        self.smallest.unwrap_or(0.0)
    }
}

/// A scene curve ready for keys, with the rest pose of the node it animates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Track {
    pub curve: CurveId,
    pub node: NodeId,
    pub rest: Transform,
}

/// Finds or creates the curve driving `node_name`'s `channel`.
///
/// The node's rest pose is cached on first lookup. Reused rotation curves are switched back
/// to Euler interpolation before keying.
pub fn get_or_create_track(
    host: &mut dyn SceneHost,
    rest_poses: &mut RestPoseCache,
    node_name: &str,
    channel: Channel,
) -> Option<Track> {
    let node = match host.find_node(node_name) {
        Ok(Some(node)) => node,
        Ok(None) => return None,
        Err(HostError::NameConflict { .. }) => {
            report(
                host,
                format!(
                    "Unable to animate {node_name}[{}] due to a name conflict in the scene",
                    channel.attribute_name()
                ),
            );
            return None;
        }
        Err(e) => {
            report(host, format!("Unable to animate {node_name}: {e}"));
            return None;
        }
    };

    let rest = match rest_poses.save(host, node) {
        Ok(rest) => rest,
        Err(e) => {
            report(host, format!("Unable to read the rest pose of {node_name}: {e}"));
            return None;
        }
    };

    let curve = match host.find_curve(node, channel) {
        Some(curve) => {
            if channel.is_rotation()
                && host.curve_interpolation(curve) != RotationInterpolation::None
            {
                if let Err(e) = host.set_curve_interpolation(curve, RotationInterpolation::None) {
                    log::debug!("interpolation of {node_name} not reset: {e}");
                }
            }
            curve
        }
        None => match host.create_curve(node, channel) {
            Ok(curve) => curve,
            Err(e) => {
                report(host, format!("Unable to animate {node_name}: {e}"));
                return None;
            }
        },
    };

    Some(Track { curve, node, rest })
}

fn rest_component(rest: &Transform, channel: Channel) -> f64 {
    match channel {
        Channel::TranslateX
        | Channel::TranslateY
        | Channel::TranslateZ
        | Channel::ScaleX
        | Channel::ScaleY
        | Channel::ScaleZ => rest.channel(channel).unwrap_or_default(),
        _ => 0.0,
    }
}

fn key_times(frames: &[u32], start: f64, range: &mut FrameRange) -> Vec<f64> {
    frames
        .iter()
        .map(|frame| {
            let time = f64::from(*frame) + start;
            range.include(time);
            time
        })
        .collect()
}

/// Keys one scalar channel. Values beyond the frame count are ignored.
pub fn import_scalar_track(
    host: &mut dyn SceneHost,
    track: &Track,
    channel: Channel,
    times: &[f64],
    values: &[f64],
    mode: BlendMode,
    blend_weight: f64,
) -> Result<(), HostError> {
    let values: Vec<f64> = match mode {
        BlendMode::Absolute => values.to_vec(),
        BlendMode::Additive => times
            .iter()
            .zip(values)
            .map(|(time, value)| {
                let sample = host.evaluate_curve(track.curve, *time)?;
                Ok(lerp(sample, sample + value, blend_weight))
            })
            .collect::<Result<_, HostError>>()?,
        BlendMode::Relative => {
            let rest = rest_component(&track.rest, channel);
            values.iter().map(|value| rest + value).collect()
        }
    };
    let count = times.len().min(values.len());
    if count == 0 {
        return Ok(());
    }
    host.add_keys(track.curve, &times[..count], &values[..count], TangentType::Linear)
}

/// Keys a quaternion curve as three Euler channels. Missing axis tracks are skipped on write
/// and read as zero when blending.
pub fn import_rotation_tracks(
    host: &mut dyn SceneHost,
    tracks: &[Option<Track>; 3],
    times: &[f64],
    values: &[f64],
    mode: BlendMode,
    blend_weight: f32,
) -> Result<(), HostError> {
    let rest = tracks[0]
        .as_ref()
        .map_or(Quat::IDENTITY, |t| t.rest.rotation());

    let mut eulers = Vec::with_capacity(times.len());
    for (time, chunk) in times.iter().zip(values.chunks_exact(4)) {
        let frame = Quat::from_xyzw(chunk[0] as f32, chunk[1] as f32, chunk[2] as f32, chunk[3] as f32);
        let rotation = match mode {
            BlendMode::Absolute => frame,
            BlendMode::Additive => {
                let mut sample = [0.0f32; 3];
                for (axis, track) in tracks.iter().enumerate() {
                    if let Some(track) = track {
                        sample[axis] = host.evaluate_curve(track.curve, *time)? as f32;
                    }
                }
                let additive = euler_to_quat(Vec3::from_array(sample));
                slerp(additive, compose(frame, additive), blend_weight)
            }
            BlendMode::Relative => compose(rest, frame),
        };
        eulers.push(quat_to_euler(rotation));
    }
    if eulers.is_empty() {
        return Ok(());
    }

    let times = &times[..eulers.len()];
    for (axis, track) in tracks.iter().enumerate() {
        let Some(track) = track else {
            continue;
        };
        let axis_values: Vec<f64> = eulers.iter().map(|e| f64::from(e[axis])).collect();
        host.add_keys(track.curve, times, &axis_values, TangentType::Linear)?;
    }
    Ok(())
}

/// Imports one document curve, returning the frame span it covered.
pub fn import_curve(
    host: &mut dyn SceneHost,
    rest_poses: &mut RestPoseCache,
    curve: &Curve<'_>,
    start: f64,
) -> FrameRange {
    let mut range = FrameRange {
        smallest: None,
        largest: 0.0,
    };
    let Some(property) = curve.key_property_name().and_then(CurveProperty::from_key) else {
        log::debug!("skipping curve with unsupported property {:?}", curve.key_property_name());
        return range;
    };
    let node_name = curve.node_name().unwrap_or_default();
    let Some(mode) = BlendMode::from_name(curve.mode()) else {
        report(
            host,
            format!("Unknown curve mode {:?} on {node_name}, skipping", curve.mode()),
        );
        return range;
    };

    let frames = curve.key_frame_buffer();
    let values = curve.key_value_buffer();
    let weight = curve.additive_blend_weight();

    let result = match property.scalar_channel() {
        Some(channel) => {
            let Some(track) = get_or_create_track(host, rest_poses, node_name, channel) else {
                return range;
            };
            let times = key_times(&frames, start, &mut range);
            import_scalar_track(host, &track, channel, &times, &values, mode, f64::from(weight))
        }
        None => {
            let tracks = Channel::ROTATION
                .map(|channel| get_or_create_track(host, rest_poses, node_name, channel));
            let times = key_times(&frames, start, &mut range);
            let result = import_rotation_tracks(host, &tracks, &times, &values, mode, weight);
            for track in tracks.iter().flatten() {
                if let Err(e) =
                    host.set_curve_interpolation(track.curve, RotationInterpolation::Quaternion)
                {
                    log::debug!("quaternion interpolation not set on {node_name}: {e}");
                }
            }
            result
        }
    };
    if let Err(e) = result {
        report(
            host,
            format!("Unable to key {node_name}[{}]: {e}", property.key()),
        );
    }
    range
}

fn import_notification_track(
    session: &mut Session,
    track: &NotificationTrack<'_>,
    start: f64,
    range: &mut FrameRange,
) {
    let name = track.name().unwrap_or_default();
    for frame in track.key_frame_buffer() {
        let time = f64::from(frame) + start;
        range.include(time);
        session.notifications.add(name, time as i32);
    }
}

/// Imports one document animation onto already-built nodes.
pub fn import_animation(host: &mut dyn SceneHost, session: &mut Session, animation: &Animation<'_>) {
    host.set_auto_key(false);

    if session.settings.import_reset {
        session.reset_scene(host);
    }

    host.set_playback_mode(if animation.looping() {
        PlaybackMode::Loop
    } else {
        PlaybackMode::Once
    });
    host.set_time_unit(TimeUnit::from_framerate(animation.framerate()));

    let start = if session.settings.import_at_time {
        host.playback().current
    } else {
        0.0
    };

    let mut range = FrameRange::default();
    let curves = animation.curves();
    Progress::begin(host, "Importing animation...", curves.len());
    for curve in &curves {
        let span = import_curve(host, &mut session.rest_poses, curve, start);
        if let Some(smallest) = span.smallest {
            range.include(smallest);
            range.include(span.largest);
        }
        Progress::step(host);
    }
    Progress::end(host);

    let notifications = animation.notifications();
    if !notifications.is_empty() {
        if let Err(e) = session.notifications.load_from(host) {
            report(host, format!("Unable to read scene notifications: {e}"));
        }
        for track in &notifications {
            import_notification_track(session, track, start, &mut range);
        }
        if let Err(e) = session.notifications.store_to(host) {
            report(host, format!("Unable to store scene notifications: {e}"));
        }
    }

    let first = range.start();
    host.set_playback_range(first, range.largest);
    host.set_current_time(first);
    log::debug!(
        "imported {} curves, playback {first}..{}",
        curves.len(),
        range.largest
    );
}
