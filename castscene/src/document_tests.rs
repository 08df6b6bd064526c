use crate::{
    Bone, CastFile, CastNode, NodeKind, PropertyValues, Root, color_from_packed, color_to_packed,
};
use glam::{Quat, Vec3};

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-6,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

#[test]
fn node_kind_ids_round_trip_and_keep_unknown_ids() {
    for kind in [
        NodeKind::Root,
        NodeKind::Model,
        NodeKind::Mesh,
        NodeKind::Skeleton,
        NodeKind::Bone,
        NodeKind::Curve,
        NodeKind::Instance,
    ] {
        assert_eq!(NodeKind::from_id(kind.id()), kind);
    }
    assert_eq!(NodeKind::from_id(0x1234_5678), NodeKind::Unknown(0x1234_5678));
    assert_eq!(NodeKind::Root.id().to_le_bytes(), *b"root");
}

#[test]
fn narrowest_unsigned_picks_smallest_storage() {
    assert_eq!(
        PropertyValues::narrowest_unsigned(&[0, 255]),
        PropertyValues::Byte(vec![0, 255])
    );
    assert_eq!(
        PropertyValues::narrowest_unsigned(&[1, 256]),
        PropertyValues::Short(vec![1, 256])
    );
    assert_eq!(
        PropertyValues::narrowest_unsigned(&[70_000]),
        PropertyValues::Integer32(vec![70_000])
    );
    assert_eq!(PropertyValues::narrowest_unsigned(&[]), PropertyValues::Byte(Vec::new()));
}

#[test]
fn set_property_replaces_in_place() {
    let mut node = CastNode::new(NodeKind::Bone);
    node.set_property("n", PropertyValues::String("a".to_string()));
    node.set_property("p", PropertyValues::Byte(vec![1]));
    node.set_property("n", PropertyValues::String("b".to_string()));

    assert_eq!(node.properties().len(), 2);
    assert_eq!(node.properties()[0].name, "n");
    assert_eq!(node.property("n").and_then(PropertyValues::as_str), Some("b"));
}

#[test]
fn fresh_nodes_get_distinct_hashes() {
    let a = CastNode::new(NodeKind::Bone);
    let b = CastNode::new(NodeKind::Bone);
    assert_ne!(a.hash(), b.hash());
}

#[test]
fn bone_defaults_and_parent_reinterpretation() {
    let mut node = CastNode::new(NodeKind::Bone);
    let bone = Bone::new(&node).expect("bone view");
    assert_eq!(bone.parent_index(), -1);
    assert_eq!(bone.local_position(), None);
    assert_eq!(bone.segment_scale_compensate(), None);

    node.set_property("p", PropertyValues::Integer32(vec![0xFFFF_FFFF]));
    let bone = Bone::new(&node).expect("bone view");
    assert_eq!(bone.parent_index(), -1);

    node.set_property("p", PropertyValues::Byte(vec![3]));
    node.set_property("ssc", PropertyValues::Byte(vec![0]));
    let bone = Bone::new(&node).expect("bone view");
    assert_eq!(bone.parent_index(), 3);
    assert_eq!(bone.segment_scale_compensate(), Some(false));
}

#[test]
fn views_reject_nodes_of_another_kind() {
    let node = CastNode::new(NodeKind::Mesh);
    assert!(Bone::new(&node).is_none());
    assert!(Root::new(&node).is_none());
}

#[test]
fn builders_produce_readable_documents() {
    let mut file = CastFile::new();
    let mut root = file.create_root();
    let mut model = root.create_model();
    model.set_name("hero");
    let mut skeleton = model.create_skeleton();
    skeleton
        .create_bone()
        .set_name("pelvis")
        .set_local_position(Vec3::new(0.0, 1.0, 0.0))
        .set_local_rotation(Quat::IDENTITY);
    skeleton.create_bone().set_name("spine").set_parent_index(0);

    let root = Root::new(&file.roots()[0]).expect("root view");
    let models = root.models();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name(), Some("hero"));

    let bones = models[0].skeleton().expect("skeleton").bones();
    assert_eq!(bones.len(), 2);
    assert_eq!(bones[0].parent_index(), -1);
    assert_eq!(bones[1].parent_index(), 0);
    assert_eq!(bones[0].local_position(), Some(Vec3::new(0.0, 1.0, 0.0)));
    assert_eq!(bones[1].name(), Some("spine"));
}

#[test]
fn mesh_defaults() {
    let mut file = CastFile::new();
    let mut root = file.create_root();
    root.create_model().create_mesh();

    let root = Root::new(&file.roots()[0]).expect("root view");
    let mesh = root.models()[0].meshes()[0];
    assert_eq!(mesh.vertex_count(), 0);
    assert_eq!(mesh.uv_layer_count(), 0);
    assert_eq!(mesh.maximum_weight_influence(), 0);
    assert_eq!(mesh.skinning_method(), "linear");
    assert_eq!(mesh.material(), None);
}

#[test]
fn material_slots_resolve_child_files() {
    let mut file = CastFile::new();
    let mut root = file.create_root();
    let mut model = root.create_model();
    let mut material = model.create_material();
    material.set_name("skin").set_material_type("pbr");
    let texture = {
        let mut file = material.create_file();
        file.set_path("textures/skin_c.png");
        file.hash()
    };
    material.set_slot("albedo", texture);
    material.set_slot("normal", 0xDEAD);

    let root = Root::new(&file.roots()[0]).expect("root view");
    let material = root.models()[0].materials()[0];
    assert_eq!(material.material_type(), Some("pbr"));
    let slots = material.slots();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].0, "albedo");
    assert_eq!(slots[0].1.path(), Some("textures/skin_c.png"));
}

#[test]
fn curve_defaults_and_flattened_values() {
    let mut file = CastFile::new();
    let mut root = file.create_root();
    let mut animation = root.create_animation();
    animation
        .create_curve()
        .set_node_name("pelvis")
        .set_key_property_name("rq")
        .set_key_frame_buffer(&[0, 10])
        .set_vec4_key_value_buffer(vec![[0.0, 0.0, 0.0, 1.0], [1.0, 0.0, 0.0, 0.0]]);

    let root = Root::new(&file.roots()[0]).expect("root view");
    let animation = root.animations()[0];
    assert_eq!(animation.framerate(), None);
    assert!(!animation.looping());

    let curve = animation.curves()[0];
    assert_eq!(curve.mode(), None);
    assert_approx(curve.additive_blend_weight(), 1.0);
    assert_eq!(curve.key_frame_buffer(), vec![0, 10]);
    assert_eq!(
        curve.key_value_buffer(),
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn instance_defaults() {
    let mut file = CastFile::new();
    let mut root = file.create_root();
    root.create_instance().set_name("crate_01");

    let root = Root::new(&file.roots()[0]).expect("root view");
    let instance = root.instances()[0];
    assert_eq!(instance.reference_file(), None);
    assert_eq!(instance.position(), Vec3::ZERO);
    assert_eq!(instance.rotation(), Quat::IDENTITY);
    assert_eq!(instance.scale(), Vec3::ONE);
}

#[test]
fn packed_colors_are_rgba_in_ascending_bytes() {
    let [r, g, b, a] = color_from_packed(0xFF00_80FF);
    assert_approx(r, 1.0);
    assert_approx(g, 128.0 / 255.0);
    assert_approx(b, 0.0);
    assert_approx(a, 1.0);

    assert_eq!(color_to_packed([1.0, 128.0 / 255.0, 0.0, 1.0]), 0xFF00_80FF);
    assert_eq!(color_to_packed([2.0, -1.0, 0.0, 0.0]), 0x0000_00FF);
}
