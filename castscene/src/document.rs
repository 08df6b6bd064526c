//! In-memory Cast document: a tree of typed nodes carrying named property buffers.
//!
//! Read access goes through lightweight views (`Model`, `Bone`, `Curve`, ...) that apply the
//! format's defaults. Export and tests build documents through the matching `*Mut` views.

use crate::ids::next_node_hash;
use glam::{Quat, Vec3};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeKind {
    Root,
    Model,
    Mesh,
    BlendShape,
    Skeleton,
    Bone,
    IkHandle,
    Constraint,
    Animation,
    Curve,
    NotificationTrack,
    Material,
    File,
    Instance,
    Unknown(u32),
}

impl NodeKind {
    pub fn id(self) -> u32 {
        match self {
            Self::Root => 0x746F_6F72,
            Self::Model => 0x6C64_6F6D,
            Self::Mesh => 0x6873_656D,
            Self::BlendShape => 0x6873_6C62,
            Self::Skeleton => 0x6C65_6B73,
            Self::Bone => 0x656E_6F62,
            Self::IkHandle => 0x6468_6B69,
            Self::Constraint => 0x7473_6E63,
            Self::Animation => 0x6D69_6E61,
            Self::Curve => 0x7672_7563,
            Self::NotificationTrack => 0x6669_746E,
            Self::Material => 0x6C74_616D,
            Self::File => 0x656C_6966,
            Self::Instance => 0x7473_6E69,
            Self::Unknown(id) => id,
        }
    }

    pub fn from_id(id: u32) -> Self {
        match id {
            0x746F_6F72 => Self::Root,
            0x6C64_6F6D => Self::Model,
            0x6873_656D => Self::Mesh,
            0x6873_6C62 => Self::BlendShape,
            0x6C65_6B73 => Self::Skeleton,
            0x656E_6F62 => Self::Bone,
            0x6468_6B69 => Self::IkHandle,
            0x7473_6E63 => Self::Constraint,
            0x6D69_6E61 => Self::Animation,
            0x7672_7563 => Self::Curve,
            0x6669_746E => Self::NotificationTrack,
            0x6C74_616D => Self::Material,
            0x656C_6966 => Self::File,
            0x7473_6E69 => Self::Instance,
            other => Self::Unknown(other),
        }
    }
}

/// Typed values of one property. Vector variants hold one element per vector.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValues {
    Byte(Vec<u8>),
    Short(Vec<u16>),
    Integer32(Vec<u32>),
    Integer64(Vec<u64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    String(String),
    Vector2(Vec<[f32; 2]>),
    Vector3(Vec<[f32; 3]>),
    Vector4(Vec<[f32; 4]>),
}

impl PropertyValues {
    /// Picks the narrowest unsigned storage (`b`, `h` or `i`) able to hold every value.
    pub fn narrowest_unsigned(values: &[u32]) -> Self {
        let maximum = values.iter().copied().max().unwrap_or(0);
        if maximum <= u32::from(u8::MAX) {
            Self::Byte(values.iter().map(|&v| v as u8).collect())
        } else if maximum <= u32::from(u16::MAX) {
            Self::Short(values.iter().map(|&v| v as u16).collect())
        } else {
            Self::Integer32(values.to_vec())
        }
    }

    pub fn type_id(&self) -> &'static str {
        match self {
            Self::Byte(_) => "b",
            Self::Short(_) => "h",
            Self::Integer32(_) => "i",
            Self::Integer64(_) => "l",
            Self::Float(_) => "f",
            Self::Double(_) => "d",
            Self::String(_) => "s",
            Self::Vector2(_) => "2v",
            Self::Vector3(_) => "3v",
            Self::Vector4(_) => "4v",
        }
    }

    /// Number of stored elements; a string counts as one.
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Integer32(v) => v.len(),
            Self::Integer64(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::String(_) => 1,
            Self::Vector2(v) => v.len(),
            Self::Vector3(v) => v.len(),
            Self::Vector4(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn integer(&self, index: usize) -> Option<u64> {
        match self {
            Self::Byte(v) => v.get(index).map(|&x| u64::from(x)),
            Self::Short(v) => v.get(index).map(|&x| u64::from(x)),
            Self::Integer32(v) => v.get(index).map(|&x| u64::from(x)),
            Self::Integer64(v) => v.get(index).copied(),
            _ => None,
        }
    }

    pub fn integers(&self) -> Option<Vec<u64>> {
        match self {
            Self::Byte(v) => Some(v.iter().map(|&x| u64::from(x)).collect()),
            Self::Short(v) => Some(v.iter().map(|&x| u64::from(x)).collect()),
            Self::Integer32(v) => Some(v.iter().map(|&x| u64::from(x)).collect()),
            Self::Integer64(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Every numeric component as `f64`, vectors flattened. Strings yield nothing.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Self::Byte(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Short(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Integer32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Integer64(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Float(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Double(v) => v.clone(),
            Self::String(_) => Vec::new(),
            Self::Vector2(v) => v.iter().flatten().map(|&x| f64::from(x)).collect(),
            Self::Vector3(v) => v.iter().flatten().map(|&x| f64::from(x)).collect(),
            Self::Vector4(v) => v.iter().flatten().map(|&x| f64::from(x)).collect(),
        }
    }

    pub fn first_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => v.first().map(|&x| f64::from(x)),
            Self::Double(v) => v.first().copied(),
            _ => self.integer(0).map(|x| x as f64),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CastProperty {
    pub name: String,
    pub values: PropertyValues,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CastNode {
    kind: NodeKind,
    hash: u64,
    properties: Vec<CastProperty>,
    children: Vec<CastNode>,
}

impl CastNode {
    pub fn new(kind: NodeKind) -> Self {
        Self::with_hash(kind, next_node_hash())
    }

    pub fn with_hash(kind: NodeKind, hash: u64) -> Self {
        Self {
            kind,
            hash,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn properties(&self) -> &[CastProperty] {
        &self.properties
    }

    pub fn children(&self) -> &[CastNode] {
        &self.children
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValues> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.values)
    }

    /// Replaces the property in place when it exists, otherwise appends it.
    pub fn set_property(&mut self, name: &str, values: PropertyValues) {
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.values = values,
            None => self.properties.push(CastProperty {
                name: name.to_string(),
                values,
            }),
        }
    }

    pub fn push_child(&mut self, child: CastNode) -> &mut CastNode {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn create_child(&mut self, kind: NodeKind) -> &mut CastNode {
        self.push_child(CastNode::new(kind))
    }

    pub fn children_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &CastNode> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    pub fn child_by_hash(&self, hash: u64) -> Option<&CastNode> {
        self.children.iter().find(|c| c.hash == hash)
    }

    pub(crate) fn string(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(PropertyValues::as_str)
    }

    pub(crate) fn integer(&self, name: &str) -> Option<u64> {
        self.property(name).and_then(|p| p.integer(0))
    }

    pub(crate) fn flag(&self, name: &str) -> Option<bool> {
        self.integer(name).map(|v| v == 1)
    }

    pub(crate) fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.property(name)? {
            PropertyValues::Vector3(v) => v.first().map(|&c| Vec3::from_array(c)),
            _ => None,
        }
    }

    pub(crate) fn quat(&self, name: &str) -> Option<Quat> {
        match self.property(name)? {
            PropertyValues::Vector4(v) => v.first().map(|&[x, y, z, w]| Quat::from_xyzw(x, y, z, w)),
            _ => None,
        }
    }

    pub(crate) fn u32_buffer(&self, name: &str) -> Option<Vec<u32>> {
        self.property(name)?
            .integers()
            .map(|v| v.into_iter().map(|x| x as u32).collect())
    }

    pub(crate) fn set_string(&mut self, name: &str, value: &str) {
        self.set_property(name, PropertyValues::String(value.to_string()));
    }

    pub(crate) fn set_flag(&mut self, name: &str, value: bool) {
        self.set_property(name, PropertyValues::Byte(vec![u8::from(value)]));
    }

    pub(crate) fn set_hash_ref(&mut self, name: &str, hash: u64) {
        self.set_property(name, PropertyValues::Integer64(vec![hash]));
    }
}

/// A parsed or freshly built Cast document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CastFile {
    roots: Vec<CastNode>,
}

impl CastFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roots(roots: Vec<CastNode>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[CastNode] {
        &self.roots
    }

    pub fn create_root(&mut self) -> RootMut<'_> {
        self.roots.push(CastNode::new(NodeKind::Root));
        let last = self.roots.len() - 1;
        RootMut {
            node: &mut self.roots[last],
        }
    }
}

macro_rules! node_views {
    ($($view:ident / $view_mut:ident => $kind:ident),* $(,)?) => {
        $(
            #[derive(Copy, Clone, Debug)]
            pub struct $view<'a> {
                node: &'a CastNode,
            }

            impl<'a> $view<'a> {
                pub fn new(node: &'a CastNode) -> Option<Self> {
                    (node.kind() == NodeKind::$kind).then_some(Self { node })
                }

                pub fn node(&self) -> &'a CastNode {
                    self.node
                }

                pub fn hash(&self) -> u64 {
                    self.node.hash()
                }

                pub fn name(&self) -> Option<&'a str> {
                    self.node.string("n")
                }
            }

            pub struct $view_mut<'a> {
                node: &'a mut CastNode,
            }

            impl<'a> $view_mut<'a> {
                pub fn new(node: &'a mut CastNode) -> Option<Self> {
                    (node.kind() == NodeKind::$kind).then_some(Self { node })
                }

                pub fn hash(&self) -> u64 {
                    self.node.hash()
                }

                pub fn set_name(&mut self, name: &str) -> &mut Self {
                    self.node.set_string("n", name);
                    self
                }
            }
        )*
    };
}

node_views! {
    Root / RootMut => Root,
    Model / ModelMut => Model,
    Mesh / MeshMut => Mesh,
    BlendShape / BlendShapeMut => BlendShape,
    Skeleton / SkeletonMut => Skeleton,
    Bone / BoneMut => Bone,
    IkHandle / IkHandleMut => IkHandle,
    Constraint / ConstraintMut => Constraint,
    Animation / AnimationMut => Animation,
    Curve / CurveMut => Curve,
    NotificationTrack / NotificationTrackMut => NotificationTrack,
    Material / MaterialMut => Material,
    File / FileMut => File,
    Instance / InstanceMut => Instance,
}

fn views<'a, T>(
    node: &'a CastNode,
    kind: NodeKind,
    wrap: fn(&'a CastNode) -> Option<T>,
) -> Vec<T> {
    node.children_of_kind(kind).filter_map(wrap).collect()
}

impl<'a> Root<'a> {
    pub fn models(&self) -> Vec<Model<'a>> {
        views(self.node, NodeKind::Model, Model::new)
    }

    pub fn animations(&self) -> Vec<Animation<'a>> {
        views(self.node, NodeKind::Animation, Animation::new)
    }

    pub fn instances(&self) -> Vec<Instance<'a>> {
        views(self.node, NodeKind::Instance, Instance::new)
    }
}

impl RootMut<'_> {
    pub fn create_model(&mut self) -> ModelMut<'_> {
        ModelMut {
            node: self.node.create_child(NodeKind::Model),
        }
    }

    pub fn create_animation(&mut self) -> AnimationMut<'_> {
        AnimationMut {
            node: self.node.create_child(NodeKind::Animation),
        }
    }

    pub fn create_instance(&mut self) -> InstanceMut<'_> {
        InstanceMut {
            node: self.node.create_child(NodeKind::Instance),
        }
    }

    pub fn create_file(&mut self) -> FileMut<'_> {
        FileMut {
            node: self.node.create_child(NodeKind::File),
        }
    }
}

impl<'a> Model<'a> {
    pub fn skeleton(&self) -> Option<Skeleton<'a>> {
        self.node
            .children_of_kind(NodeKind::Skeleton)
            .next()
            .and_then(Skeleton::new)
    }

    pub fn meshes(&self) -> Vec<Mesh<'a>> {
        views(self.node, NodeKind::Mesh, Mesh::new)
    }

    pub fn materials(&self) -> Vec<Material<'a>> {
        views(self.node, NodeKind::Material, Material::new)
    }

    pub fn blend_shapes(&self) -> Vec<BlendShape<'a>> {
        views(self.node, NodeKind::BlendShape, BlendShape::new)
    }

    pub fn mesh_by_hash(&self, hash: u64) -> Option<Mesh<'a>> {
        self.node.child_by_hash(hash).and_then(Mesh::new)
    }

    pub fn material_by_hash(&self, hash: u64) -> Option<Material<'a>> {
        self.node.child_by_hash(hash).and_then(Material::new)
    }
}

impl ModelMut<'_> {
    pub fn create_skeleton(&mut self) -> SkeletonMut<'_> {
        SkeletonMut {
            node: self.node.create_child(NodeKind::Skeleton),
        }
    }

    pub fn create_mesh(&mut self) -> MeshMut<'_> {
        MeshMut {
            node: self.node.create_child(NodeKind::Mesh),
        }
    }

    pub fn create_material(&mut self) -> MaterialMut<'_> {
        MaterialMut {
            node: self.node.create_child(NodeKind::Material),
        }
    }

    pub fn create_blend_shape(&mut self) -> BlendShapeMut<'_> {
        BlendShapeMut {
            node: self.node.create_child(NodeKind::BlendShape),
        }
    }
}

impl<'a> Skeleton<'a> {
    pub fn bones(&self) -> Vec<Bone<'a>> {
        views(self.node, NodeKind::Bone, Bone::new)
    }

    pub fn ik_handles(&self) -> Vec<IkHandle<'a>> {
        views(self.node, NodeKind::IkHandle, IkHandle::new)
    }

    pub fn constraints(&self) -> Vec<Constraint<'a>> {
        views(self.node, NodeKind::Constraint, Constraint::new)
    }
}

impl SkeletonMut<'_> {
    pub fn create_bone(&mut self) -> BoneMut<'_> {
        BoneMut {
            node: self.node.create_child(NodeKind::Bone),
        }
    }

    pub fn create_ik_handle(&mut self) -> IkHandleMut<'_> {
        IkHandleMut {
            node: self.node.create_child(NodeKind::IkHandle),
        }
    }

    pub fn create_constraint(&mut self) -> ConstraintMut<'_> {
        ConstraintMut {
            node: self.node.create_child(NodeKind::Constraint),
        }
    }
}

impl Bone<'_> {
    /// Parent bone index, `-1` for a root. Stored unsigned, reinterpreted as signed 32-bit.
    pub fn parent_index(&self) -> i32 {
        self.node
            .integer("p")
            .map(|raw| (raw & 0xFFFF_FFFF) as u32 as i32)
            .unwrap_or(-1)
    }

    pub fn segment_scale_compensate(&self) -> Option<bool> {
        self.node.flag("ssc")
    }

    pub fn local_position(&self) -> Option<Vec3> {
        self.node.vec3("lp")
    }

    pub fn local_rotation(&self) -> Option<Quat> {
        self.node.quat("lr")
    }

    pub fn world_position(&self) -> Option<Vec3> {
        self.node.vec3("wp")
    }

    pub fn world_rotation(&self) -> Option<Quat> {
        self.node.quat("wr")
    }

    pub fn scale(&self) -> Option<Vec3> {
        self.node.vec3("s")
    }
}

impl BoneMut<'_> {
    pub fn set_parent_index(&mut self, index: i32) -> &mut Self {
        self.node
            .set_property("p", PropertyValues::Integer32(vec![index as u32]));
        self
    }

    pub fn set_segment_scale_compensate(&mut self, enabled: bool) -> &mut Self {
        self.node.set_flag("ssc", enabled);
        self
    }

    pub fn set_local_position(&mut self, position: Vec3) -> &mut Self {
        self.node
            .set_property("lp", PropertyValues::Vector3(vec![position.to_array()]));
        self
    }

    pub fn set_local_rotation(&mut self, rotation: Quat) -> &mut Self {
        self.node
            .set_property("lr", PropertyValues::Vector4(vec![rotation.to_array()]));
        self
    }

    pub fn set_world_position(&mut self, position: Vec3) -> &mut Self {
        self.node
            .set_property("wp", PropertyValues::Vector3(vec![position.to_array()]));
        self
    }

    pub fn set_world_rotation(&mut self, rotation: Quat) -> &mut Self {
        self.node
            .set_property("wr", PropertyValues::Vector4(vec![rotation.to_array()]));
        self
    }

    pub fn set_scale(&mut self, scale: Vec3) -> &mut Self {
        self.node
            .set_property("s", PropertyValues::Vector3(vec![scale.to_array()]));
        self
    }
}

impl IkHandle<'_> {
    pub fn start_bone(&self) -> Option<u64> {
        self.node.integer("sb")
    }

    pub fn end_bone(&self) -> Option<u64> {
        self.node.integer("eb")
    }

    pub fn target_bone(&self) -> Option<u64> {
        self.node.integer("tb")
    }

    pub fn pole_vector_bone(&self) -> Option<u64> {
        self.node.integer("pv")
    }

    pub fn pole_bone(&self) -> Option<u64> {
        self.node.integer("pb")
    }

    pub fn use_target_rotation(&self) -> bool {
        self.node.flag("tr").unwrap_or(false)
    }
}

impl IkHandleMut<'_> {
    pub fn set_start_bone(&mut self, hash: u64) -> &mut Self {
        self.node.set_hash_ref("sb", hash);
        self
    }

    pub fn set_end_bone(&mut self, hash: u64) -> &mut Self {
        self.node.set_hash_ref("eb", hash);
        self
    }

    pub fn set_target_bone(&mut self, hash: u64) -> &mut Self {
        self.node.set_hash_ref("tb", hash);
        self
    }

    pub fn set_pole_vector_bone(&mut self, hash: u64) -> &mut Self {
        self.node.set_hash_ref("pv", hash);
        self
    }

    pub fn set_pole_bone(&mut self, hash: u64) -> &mut Self {
        self.node.set_hash_ref("pb", hash);
        self
    }

    pub fn set_use_target_rotation(&mut self, enabled: bool) -> &mut Self {
        self.node.set_flag("tr", enabled);
        self
    }
}

impl Constraint<'_> {
    /// Raw constraint type: `pt` (point), `or` (orient) or `sc` (scale).
    pub fn constraint_type(&self) -> Option<&str> {
        self.node.string("ct")
    }

    pub fn constraint_bone(&self) -> Option<u64> {
        self.node.integer("cb")
    }

    pub fn target_bone(&self) -> Option<u64> {
        self.node.integer("tb")
    }

    pub fn maintain_offset(&self) -> bool {
        self.node.flag("mo").unwrap_or(false)
    }

    pub fn skip_x(&self) -> bool {
        self.node.flag("sx").unwrap_or(false)
    }

    pub fn skip_y(&self) -> bool {
        self.node.flag("sy").unwrap_or(false)
    }

    pub fn skip_z(&self) -> bool {
        self.node.flag("sz").unwrap_or(false)
    }
}

impl ConstraintMut<'_> {
    pub fn set_constraint_type(&mut self, value: &str) -> &mut Self {
        self.node.set_string("ct", value);
        self
    }

    pub fn set_constraint_bone(&mut self, hash: u64) -> &mut Self {
        self.node.set_hash_ref("cb", hash);
        self
    }

    pub fn set_target_bone(&mut self, hash: u64) -> &mut Self {
        self.node.set_hash_ref("tb", hash);
        self
    }

    pub fn set_maintain_offset(&mut self, enabled: bool) -> &mut Self {
        self.node.set_flag("mo", enabled);
        self
    }

    pub fn set_skip(&mut self, x: bool, y: bool, z: bool) -> &mut Self {
        self.node.set_flag("sx", x);
        self.node.set_flag("sy", y);
        self.node.set_flag("sz", z);
        self
    }
}

impl<'a> Mesh<'a> {
    pub fn vertex_position_buffer(&self) -> Option<&'a [[f32; 3]]> {
        match self.node.property("vp")? {
            PropertyValues::Vector3(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn vertex_normal_buffer(&self) -> Option<&'a [[f32; 3]]> {
        match self.node.property("vn")? {
            PropertyValues::Vector3(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn vertex_tangent_buffer(&self) -> Option<&'a [[f32; 3]]> {
        match self.node.property("vt")? {
            PropertyValues::Vector3(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn vertex_color_buffer(&self) -> Option<Vec<u32>> {
        self.node.u32_buffer("vc")
    }

    pub fn face_buffer(&self) -> Option<Vec<u32>> {
        self.node.u32_buffer("f")
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_position_buffer().map_or(0, <[_]>::len)
    }

    pub fn uv_layer_count(&self) -> usize {
        self.node.integer("ul").unwrap_or(0) as usize
    }

    pub fn uv_layer_buffer(&self, index: usize) -> Option<&'a [[f32; 2]]> {
        match self.node.property(&format!("u{index}"))? {
            PropertyValues::Vector2(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn maximum_weight_influence(&self) -> u32 {
        self.node.integer("mi").unwrap_or(0) as u32
    }

    pub fn skinning_method(&self) -> &'a str {
        self.node.string("sm").unwrap_or("linear")
    }

    pub fn weight_bone_buffer(&self) -> Option<Vec<u32>> {
        self.node.u32_buffer("wb")
    }

    pub fn weight_value_buffer(&self) -> Option<&'a [f32]> {
        match self.node.property("wv")? {
            PropertyValues::Float(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Hash of the referenced material, resolved against the owning model.
    pub fn material(&self) -> Option<u64> {
        self.node.integer("m")
    }
}

impl MeshMut<'_> {
    pub fn set_vertex_position_buffer(&mut self, positions: Vec<[f32; 3]>) -> &mut Self {
        self.node
            .set_property("vp", PropertyValues::Vector3(positions));
        self
    }

    pub fn set_vertex_normal_buffer(&mut self, normals: Vec<[f32; 3]>) -> &mut Self {
        self.node.set_property("vn", PropertyValues::Vector3(normals));
        self
    }

    pub fn set_vertex_tangent_buffer(&mut self, tangents: Vec<[f32; 3]>) -> &mut Self {
        self.node.set_property("vt", PropertyValues::Vector3(tangents));
        self
    }

    pub fn set_vertex_color_buffer(&mut self, colors: Vec<u32>) -> &mut Self {
        self.node.set_property("vc", PropertyValues::Integer32(colors));
        self
    }

    pub fn set_face_buffer(&mut self, faces: &[u32]) -> &mut Self {
        self.node
            .set_property("f", PropertyValues::narrowest_unsigned(faces));
        self
    }

    pub fn set_uv_layer_count(&mut self, count: u8) -> &mut Self {
        self.node.set_property("ul", PropertyValues::Byte(vec![count]));
        self
    }

    pub fn set_uv_layer_buffer(&mut self, index: usize, uvs: Vec<[f32; 2]>) -> &mut Self {
        self.node
            .set_property(&format!("u{index}"), PropertyValues::Vector2(uvs));
        self
    }

    pub fn set_maximum_weight_influence(&mut self, maximum: u8) -> &mut Self {
        self.node.set_property("mi", PropertyValues::Byte(vec![maximum]));
        self
    }

    pub fn set_skinning_method(&mut self, method: &str) -> &mut Self {
        self.node.set_string("sm", method);
        self
    }

    pub fn set_weight_bone_buffer(&mut self, bones: &[u32]) -> &mut Self {
        self.node
            .set_property("wb", PropertyValues::narrowest_unsigned(bones));
        self
    }

    pub fn set_weight_value_buffer(&mut self, weights: Vec<f32>) -> &mut Self {
        self.node.set_property("wv", PropertyValues::Float(weights));
        self
    }

    pub fn set_material(&mut self, hash: u64) -> &mut Self {
        self.node.set_hash_ref("m", hash);
        self
    }
}

impl<'a> Material<'a> {
    pub fn material_type(&self) -> Option<&'a str> {
        self.node.string("t")
    }

    /// Every property other than name and type names a texture slot referencing a child file.
    pub fn slots(&self) -> Vec<(&'a str, File<'a>)> {
        self.node
            .properties()
            .iter()
            .filter(|p| p.name != "n" && p.name != "t")
            .filter_map(|p| {
                let hash = p.values.integer(0)?;
                let file = self.node.child_by_hash(hash).and_then(File::new)?;
                Some((p.name.as_str(), file))
            })
            .collect()
    }
}

impl MaterialMut<'_> {
    pub fn set_material_type(&mut self, value: &str) -> &mut Self {
        self.node.set_string("t", value);
        self
    }

    pub fn set_slot(&mut self, slot: &str, hash: u64) -> &mut Self {
        self.node.set_hash_ref(slot, hash);
        self
    }

    pub fn create_file(&mut self) -> FileMut<'_> {
        FileMut {
            node: self.node.create_child(NodeKind::File),
        }
    }
}

impl<'a> File<'a> {
    pub fn path(&self) -> Option<&'a str> {
        self.node.string("p")
    }
}

impl FileMut<'_> {
    pub fn set_path(&mut self, path: &str) -> &mut Self {
        self.node.set_string("p", path);
        self
    }
}

impl BlendShape<'_> {
    pub fn base_shape(&self) -> Option<u64> {
        self.node.integer("b")
    }

    pub fn target_shapes(&self) -> Option<Vec<u64>> {
        self.node.property("t")?.integers()
    }

    pub fn target_weight_scales(&self) -> Option<Vec<f32>> {
        match self.node.property("ts")? {
            PropertyValues::Float(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl BlendShapeMut<'_> {
    pub fn set_base_shape(&mut self, hash: u64) -> &mut Self {
        self.node.set_hash_ref("b", hash);
        self
    }

    pub fn set_target_shapes(&mut self, hashes: Vec<u64>) -> &mut Self {
        self.node.set_property("t", PropertyValues::Integer64(hashes));
        self
    }

    pub fn set_target_weight_scales(&mut self, scales: Vec<f32>) -> &mut Self {
        self.node.set_property("ts", PropertyValues::Float(scales));
        self
    }
}

impl<'a> Animation<'a> {
    pub fn curves(&self) -> Vec<Curve<'a>> {
        views(self.node, NodeKind::Curve, Curve::new)
    }

    pub fn notifications(&self) -> Vec<NotificationTrack<'a>> {
        views(self.node, NodeKind::NotificationTrack, NotificationTrack::new)
    }

    pub fn framerate(&self) -> Option<f32> {
        self.node
            .property("fr")
            .and_then(PropertyValues::first_f64)
            .map(|v| v as f32)
    }

    pub fn looping(&self) -> bool {
        self.node.flag("lo").unwrap_or(false)
    }
}

impl AnimationMut<'_> {
    pub fn set_framerate(&mut self, framerate: f32) -> &mut Self {
        self.node.set_property("fr", PropertyValues::Float(vec![framerate]));
        self
    }

    pub fn set_looping(&mut self, enabled: bool) -> &mut Self {
        self.node.set_flag("lo", enabled);
        self
    }

    pub fn create_curve(&mut self) -> CurveMut<'_> {
        CurveMut {
            node: self.node.create_child(NodeKind::Curve),
        }
    }

    pub fn create_notification(&mut self) -> NotificationTrackMut<'_> {
        NotificationTrackMut {
            node: self.node.create_child(NodeKind::NotificationTrack),
        }
    }
}

impl<'a> Curve<'a> {
    pub fn node_name(&self) -> Option<&'a str> {
        self.node.string("nn")
    }

    pub fn key_property_name(&self) -> Option<&'a str> {
        self.node.string("kp")
    }

    pub fn key_frame_buffer(&self) -> Vec<u32> {
        self.node.u32_buffer("kb").unwrap_or_default()
    }

    /// Key values flattened; quaternion curves carry four components per key.
    pub fn key_value_buffer(&self) -> Vec<f64> {
        self.node
            .property("kv")
            .map(PropertyValues::to_f64_vec)
            .unwrap_or_default()
    }

    pub fn mode(&self) -> Option<&'a str> {
        self.node.string("m")
    }

    pub fn additive_blend_weight(&self) -> f32 {
        self.node
            .property("ab")
            .and_then(PropertyValues::first_f64)
            .map_or(1.0, |v| v as f32)
    }
}

impl CurveMut<'_> {
    pub fn set_node_name(&mut self, name: &str) -> &mut Self {
        self.node.set_string("nn", name);
        self
    }

    pub fn set_key_property_name(&mut self, name: &str) -> &mut Self {
        self.node.set_string("kp", name);
        self
    }

    pub fn set_key_frame_buffer(&mut self, frames: &[u32]) -> &mut Self {
        self.node
            .set_property("kb", PropertyValues::narrowest_unsigned(frames));
        self
    }

    pub fn set_float_key_value_buffer(&mut self, values: Vec<f32>) -> &mut Self {
        self.node.set_property("kv", PropertyValues::Float(values));
        self
    }

    pub fn set_vec4_key_value_buffer(&mut self, values: Vec<[f32; 4]>) -> &mut Self {
        self.node.set_property("kv", PropertyValues::Vector4(values));
        self
    }

    pub fn set_byte_key_value_buffer(&mut self, values: Vec<u8>) -> &mut Self {
        self.node.set_property("kv", PropertyValues::Byte(values));
        self
    }

    pub fn set_mode(&mut self, mode: &str) -> &mut Self {
        self.node.set_string("m", mode);
        self
    }

    pub fn set_additive_blend_weight(&mut self, weight: f32) -> &mut Self {
        self.node.set_property("ab", PropertyValues::Float(vec![weight]));
        self
    }
}

impl NotificationTrack<'_> {
    pub fn key_frame_buffer(&self) -> Vec<u32> {
        self.node.u32_buffer("kb").unwrap_or_default()
    }
}

impl NotificationTrackMut<'_> {
    pub fn set_key_frame_buffer(&mut self, frames: &[u32]) -> &mut Self {
        self.node
            .set_property("kb", PropertyValues::narrowest_unsigned(frames));
        self
    }
}

impl Instance<'_> {
    /// Hash of the referenced file node, resolved against the owning root.
    pub fn reference_file(&self) -> Option<u64> {
        self.node.integer("rf")
    }

    pub fn position(&self) -> Vec3 {
        self.node.vec3("p").unwrap_or(Vec3::ZERO)
    }

    pub fn rotation(&self) -> Quat {
        self.node.quat("r").unwrap_or(Quat::IDENTITY)
    }

    pub fn scale(&self) -> Vec3 {
        self.node.vec3("s").unwrap_or(Vec3::ONE)
    }
}

impl InstanceMut<'_> {
    pub fn set_reference_file(&mut self, hash: u64) -> &mut Self {
        self.node.set_hash_ref("rf", hash);
        self
    }

    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.node
            .set_property("p", PropertyValues::Vector3(vec![position.to_array()]));
        self
    }

    pub fn set_rotation(&mut self, rotation: Quat) -> &mut Self {
        self.node
            .set_property("r", PropertyValues::Vector4(vec![rotation.to_array()]));
        self
    }

    pub fn set_scale(&mut self, scale: Vec3) -> &mut Self {
        self.node
            .set_property("s", PropertyValues::Vector3(vec![scale.to_array()]));
        self
    }
}

impl<'a> Root<'a> {
    pub fn file_by_hash(&self, hash: u64) -> Option<File<'a>> {
        self.node.child_by_hash(hash).and_then(File::new)
    }
}

/// Decodes a packed `0xAABBGGRR` vertex colour into normalized RGBA.
pub fn color_from_packed(rgba: u32) -> [f32; 4] {
    [
        (rgba & 0xFF) as f32 / 255.0,
        ((rgba >> 8) & 0xFF) as f32 / 255.0,
        ((rgba >> 16) & 0xFF) as f32 / 255.0,
        ((rgba >> 24) & 0xFF) as f32 / 255.0,
    ]
}

/// Packs normalized RGBA into a `0xAABBGGRR` vertex colour.
pub fn color_to_packed(color: [f32; 4]) -> u32 {
    color
        .iter()
        .enumerate()
        .map(|(i, c)| ((c.clamp(0.0, 1.0) * 255.0).round() as u32) << (i * 8))
        .fold(0, |acc, c| acc | c)
}
