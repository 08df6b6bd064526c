//! The narrow scene-graph capability the engine drives.
//!
//! Every engine stage talks to a `&mut dyn SceneHost`. `MemoryScene` is the in-crate
//! implementation; an application embedding the engine supplies its own.

use glam::{Quat, Vec3};
use std::path::PathBuf;
use thiserror::Error;

use crate::math::euler_to_quat;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CurveId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SkinId(pub u32);

#[derive(Clone, Debug, Error, PartialEq)]
pub enum HostError {
    #[error("no node named '{name}'")]
    MissingNode { name: String },

    #[error("invalid node handle {id}")]
    InvalidNode { id: u32 },

    #[error("invalid curve handle {id}")]
    InvalidCurve { id: u32 },

    #[error("more than one node matches '{name}'")]
    NameConflict { name: String },

    #[error("cannot parent '{child}' under '{parent}': {reason}")]
    InvalidParent {
        child: String,
        parent: String,
        reason: String,
    },

    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeType {
    Transform,
    Joint,
    Mesh,
    IkHandle,
    Constraint,
    BlendShape,
    Instance,
}

/// Local transform channels. Rotation is Euler XYZ in radians.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub translate: Vec3,
    pub rotate: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translate: Vec3::ZERO,
        rotate: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn rotation(&self) -> Quat {
        euler_to_quat(self.rotate)
    }

    pub fn channel(&self, channel: Channel) -> Option<f64> {
        let value = match channel {
            Channel::TranslateX => self.translate.x,
            Channel::TranslateY => self.translate.y,
            Channel::TranslateZ => self.translate.z,
            Channel::RotateX => self.rotate.x,
            Channel::RotateY => self.rotate.y,
            Channel::RotateZ => self.rotate.z,
            Channel::ScaleX => self.scale.x,
            Channel::ScaleY => self.scale.y,
            Channel::ScaleZ => self.scale.z,
            Channel::Visibility => return None,
        };
        Some(f64::from(value))
    }

    pub fn set_channel(&mut self, channel: Channel, value: f64) {
        let value = value as f32;
        match channel {
            Channel::TranslateX => self.translate.x = value,
            Channel::TranslateY => self.translate.y = value,
            Channel::TranslateZ => self.translate.z = value,
            Channel::RotateX => self.rotate.x = value,
            Channel::RotateY => self.rotate.y = value,
            Channel::RotateZ => self.rotate.z = value,
            Channel::ScaleX => self.scale.x = value,
            Channel::ScaleY => self.scale.y = value,
            Channel::ScaleZ => self.scale.z = value,
            Channel::Visibility => {}
        }
    }
}

/// An animatable node attribute.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Channel {
    TranslateX,
    TranslateY,
    TranslateZ,
    RotateX,
    RotateY,
    RotateZ,
    ScaleX,
    ScaleY,
    ScaleZ,
    Visibility,
}

impl Channel {
    pub const ROTATION: [Channel; 3] = [Channel::RotateX, Channel::RotateY, Channel::RotateZ];

    pub fn attribute_name(self) -> &'static str {
        match self {
            Self::TranslateX => "translateX",
            Self::TranslateY => "translateY",
            Self::TranslateZ => "translateZ",
            Self::RotateX => "rotateX",
            Self::RotateY => "rotateY",
            Self::RotateZ => "rotateZ",
            Self::ScaleX => "scaleX",
            Self::ScaleY => "scaleY",
            Self::ScaleZ => "scaleZ",
            Self::Visibility => "visibility",
        }
    }

    pub fn unit(self) -> CurveUnit {
        match self {
            Self::RotateX | Self::RotateY | Self::RotateZ => CurveUnit::Angular,
            Self::Visibility => CurveUnit::Unitless,
            _ => CurveUnit::Linear,
        }
    }

    pub fn is_rotation(self) -> bool {
        matches!(self, Self::RotateX | Self::RotateY | Self::RotateZ)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CurveUnit {
    Linear,
    Angular,
    Unitless,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TangentType {
    Linear,
    Stepped,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum RotationInterpolation {
    #[default]
    None,
    Quaternion,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum PlaybackMode {
    #[default]
    Once,
    Loop,
}

/// Scene time units keyed by frames per second.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum TimeUnit {
    Fps2,
    Fps3,
    #[default]
    Film,
    Ntsc,
    NtscField,
    Fps100,
    Fps120,
}

impl TimeUnit {
    /// Maps a document framerate onto a supported unit, falling back to film (24 fps).
    pub fn from_framerate(framerate: Option<f32>) -> Self {
        match framerate.map(|fps| fps as i32) {
            Some(2) => Self::Fps2,
            Some(3) => Self::Fps3,
            Some(24) => Self::Film,
            Some(30) => Self::Ntsc,
            Some(60) => Self::NtscField,
            Some(100) => Self::Fps100,
            Some(120) => Self::Fps120,
            _ => Self::Film,
        }
    }

    pub fn fps(self) -> f32 {
        match self {
            Self::Fps2 => 2.0,
            Self::Fps3 => 3.0,
            Self::Film => 24.0,
            Self::Ntsc => 30.0,
            Self::NtscField => 60.0,
            Self::Fps100 => 100.0,
            Self::Fps120 => 120.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub unit: TimeUnit,
    pub mode: PlaybackMode,
    pub start: f64,
    pub end: f64,
    pub current: f64,
    pub auto_key: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            unit: TimeUnit::Film,
            mode: PlaybackMode::Once,
            start: 0.0,
            end: 1.0,
            current: 0.0,
            auto_key: false,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum SkinningMethod {
    #[default]
    Linear,
    DualQuaternion,
}

impl SkinningMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(Self::Linear),
            "quaternion" => Some(Self::DualQuaternion),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConstraintKind {
    Point,
    Orient,
    Scale,
}

impl ConstraintKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pt" => Some(Self::Point),
            "or" => Some(Self::Orient),
            "sc" => Some(Self::Scale),
            _ => None,
        }
    }

    pub fn default_name(self) -> &'static str {
        match self {
            Self::Point => "CastPointConstraint",
            Self::Orient => "CastOrientConstraint",
            Self::Scale => "CastScaleConstraint",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct SkipAxes {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintOptions {
    pub name: String,
    pub maintain_offset: bool,
    pub skip: SkipAxes,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MaterialKind {
    Lambert,
    Phong,
    StingrayPbs,
}

impl MaterialKind {
    /// Unknown or missing types fall back to lambert.
    pub fn from_type(value: Option<&str>) -> Self {
        match value {
            Some("phong") => Self::Phong,
            Some("pbr") => Self::StingrayPbs,
            _ => Self::Lambert,
        }
    }

    /// Shader input a texture slot drives, if any.
    pub fn input_for_slot(self, slot: &str) -> Option<&'static str> {
        match self {
            Self::Lambert | Self::Phong => match slot {
                "albedo" | "diffuse" => Some("color"),
                "normal" => Some("normalCamera"),
                _ => None,
            },
            Self::StingrayPbs => match slot {
                "albedo" | "diffuse" => Some("TEX_color_map"),
                "normal" => Some("TEX_normal_map"),
                "metal" => Some("TEX_metallic_map"),
                "roughness" | "gloss" => Some("TEX_roughness_map"),
                "emissive" => Some("TEX_emissive_map"),
                "ao" => Some("TEX_ao_map"),
                _ => None,
            },
        }
    }

    /// Boolean toggle enabling the slot's input on PBR shaders.
    pub fn enable_flag_for_slot(self, slot: &str) -> Option<&'static str> {
        match self {
            Self::Lambert | Self::Phong => None,
            Self::StingrayPbs => match slot {
                "albedo" | "diffuse" => Some("use_color_map"),
                "normal" => Some("use_normal_map"),
                "metal" => Some("use_metallic_map"),
                "roughness" | "gloss" => Some("use_roughness_map"),
                "emissive" => Some("use_emissive_map"),
                "ao" => Some("use_ao_map"),
                _ => None,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureSlot {
    pub slot: String,
    pub path: PathBuf,
    pub input: Option<&'static str>,
    pub enable_flag: Option<&'static str>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDesc {
    pub name: String,
    pub kind: MaterialKind,
    pub textures: Vec<TextureSlot>,
}

impl MaterialDesc {
    pub fn shading_group_name(name: &str) -> String {
        format!("{name}SG")
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshGeometry {
    pub positions: Vec<Vec3>,
    /// Triangle list; every three indices form one face.
    pub faces: Vec<u32>,
}

impl MeshGeometry {
    pub fn face_count(&self) -> usize {
        self.faces.len() / 3
    }
}

/// One UV set stored per face corner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UvLayer {
    pub name: String,
    pub u: Vec<f32>,
    pub v: Vec<f32>,
}

pub const DEFAULT_SHADING_GROUP: &str = "initialShadingGroup";

pub trait SceneHost {
    fn create_transform(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, HostError>;

    fn create_joint(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, HostError>;

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), HostError>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Children of `node`, or the scene's top-level nodes for `None`.
    fn children(&self, node: Option<NodeId>) -> Vec<NodeId>;

    fn node_name(&self, node: NodeId) -> Option<String>;

    fn node_type(&self, node: NodeId) -> Option<NodeType>;

    fn full_path(&self, node: NodeId) -> Option<String>;

    /// Resolves a `|`-rooted full path exactly, or a short name that must be unique.
    fn find_node(&self, name: &str) -> Result<Option<NodeId>, HostError>;

    fn nodes_of_type(&self, node_type: NodeType) -> Vec<NodeId>;

    fn transform(&self, node: NodeId) -> Result<Transform, HostError>;

    fn set_transform(&mut self, node: NodeId, transform: Transform) -> Result<(), HostError>;

    fn joint_orient(&self, node: NodeId) -> Result<Quat, HostError>;

    fn set_joint_orient(&mut self, node: NodeId, orient: Quat) -> Result<(), HostError>;

    fn segment_scale_compensate(&self, node: NodeId) -> Result<bool, HostError>;

    fn set_segment_scale_compensate(&mut self, node: NodeId, enabled: bool)
    -> Result<(), HostError>;

    fn set_visibility(&mut self, node: NodeId, visible: bool) -> Result<(), HostError>;

    fn create_mesh(
        &mut self,
        name: &str,
        parent: NodeId,
        geometry: MeshGeometry,
    ) -> Result<NodeId, HostError>;

    fn set_vertex_normals(&mut self, mesh: NodeId, normals: &[Vec3]) -> Result<(), HostError>;

    fn set_vertex_colors(&mut self, mesh: NodeId, colors: &[[f32; 4]]) -> Result<(), HostError>;

    fn set_uv_layer(&mut self, mesh: NodeId, layer: UvLayer) -> Result<(), HostError>;

    fn has_shading_group(&self, name: &str) -> bool;

    /// Creates the shader and its shading group, returning the group name.
    fn create_material(&mut self, material: &MaterialDesc) -> Result<String, HostError>;

    fn assign_shading_group(&mut self, mesh: NodeId, group: &str) -> Result<(), HostError>;

    fn create_skin(
        &mut self,
        mesh: NodeId,
        bones: &[NodeId],
        max_influence: u32,
        method: SkinningMethod,
    ) -> Result<SkinId, HostError>;

    /// Writes one vertex's weights, ordered like the skin's bone list.
    fn set_skin_weights(
        &mut self,
        skin: SkinId,
        vertex: usize,
        weights: &[f32],
    ) -> Result<(), HostError>;

    fn create_blend_shape(
        &mut self,
        name: Option<&str>,
        base: NodeId,
        targets: &[(NodeId, f32)],
    ) -> Result<NodeId, HostError>;

    fn create_ik_handle(
        &mut self,
        name: &str,
        start: NodeId,
        end: NodeId,
    ) -> Result<NodeId, HostError>;

    /// Drives the handle's pole vector from `source`'s translation.
    fn connect_pole_vector(&mut self, handle: NodeId, source: NodeId) -> Result<(), HostError>;

    /// Drives the handle's twist from `source`'s X rotation.
    fn connect_twist(&mut self, handle: NodeId, source: NodeId) -> Result<(), HostError>;

    fn create_constraint(
        &mut self,
        kind: ConstraintKind,
        target: NodeId,
        constrained: NodeId,
        options: &ConstraintOptions,
    ) -> Result<NodeId, HostError>;

    fn set_auto_key(&mut self, enabled: bool);

    fn find_curve(&self, node: NodeId, channel: Channel) -> Option<CurveId>;

    fn create_curve(&mut self, node: NodeId, channel: Channel) -> Result<CurveId, HostError>;

    fn evaluate_curve(&self, curve: CurveId, frame: f64) -> Result<f64, HostError>;

    fn add_keys(
        &mut self,
        curve: CurveId,
        frames: &[f64],
        values: &[f64],
        tangent: TangentType,
    ) -> Result<(), HostError>;

    fn curve_interpolation(&self, curve: CurveId) -> RotationInterpolation;

    fn set_curve_interpolation(
        &mut self,
        curve: CurveId,
        mode: RotationInterpolation,
    ) -> Result<(), HostError>;

    fn keyed_frames(&self, node: NodeId, channel: Channel) -> Vec<f64>;

    /// Channel value at `frame`: the curve when one is keyed, otherwise the static value.
    fn sample_channel(&self, node: NodeId, channel: Channel, frame: f64) -> Result<f64, HostError>;

    fn delete_all_curves(&mut self);

    fn playback(&self) -> PlaybackState;

    fn set_playback_mode(&mut self, mode: PlaybackMode);

    fn set_time_unit(&mut self, unit: TimeUnit);

    fn set_playback_range(&mut self, start: f64, end: f64);

    fn set_current_time(&mut self, frame: f64);

    fn create_instance(&mut self, source: NodeId, name: &str) -> Result<NodeId, HostError>;

    /// The serialized notification store attached to the scene, if present.
    fn notification_data(&self) -> Option<String>;

    fn set_notification_data(&mut self, data: &str) -> Result<(), HostError>;

    fn clear_notification_data(&mut self);

    fn begin_progress(&mut self, _status: &str, _maximum: usize) -> Result<(), HostError> {
        Ok(())
    }

    fn step_progress(&mut self) -> Result<(), HostError> {
        Ok(())
    }

    fn end_progress(&mut self) -> Result<(), HostError> {
        Ok(())
    }

    /// Surfaces a recoverable problem to the user.
    fn warn(&mut self, _message: &str) {}
}

/// Logs a recoverable anomaly and forwards it to the host.
pub(crate) fn report(host: &mut dyn SceneHost, message: String) {
    log::warn!("{message}");
    host.warn(&message);
}

pub(crate) struct Progress;

impl Progress {
    pub(crate) fn begin(host: &mut dyn SceneHost, status: &str, maximum: usize) {
        if let Err(e) = host.begin_progress(status, maximum.max(1)) {
            log::debug!("progress begin failed: {e}");
        }
    }

    pub(crate) fn step(host: &mut dyn SceneHost) {
        if let Err(e) = host.step_progress() {
            log::debug!("progress step failed: {e}");
        }
    }

    pub(crate) fn end(host: &mut dyn SceneHost) {
        if let Err(e) = host.end_progress() {
            log::debug!("progress end failed: {e}");
        }
    }
}
