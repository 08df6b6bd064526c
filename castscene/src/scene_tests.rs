use crate::{
    Channel, DEFAULT_SHADING_GROUP, HostError, MaterialDesc, MaterialKind, MemoryScene,
    MeshGeometry, NodeType, RotationInterpolation, SceneHost, SkinningMethod, TangentType,
    Transform,
};
use glam::{Quat, Vec3};

fn assert_approx(actual: f64, expected: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-9,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn triangle() -> MeshGeometry {
    MeshGeometry {
        positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        faces: vec![0, 1, 2],
    }
}

#[test]
fn full_paths_follow_parenting() {
    let mut scene = MemoryScene::new();
    let group = scene.create_transform("Joints", None).unwrap();
    let hip = scene.create_joint("hip", Some(group)).unwrap();
    let knee = scene.create_joint("knee", Some(hip)).unwrap();

    assert_eq!(scene.full_path(knee).as_deref(), Some("|Joints|hip|knee"));
    assert_eq!(scene.parent(knee), Some(hip));
    assert_eq!(scene.children(Some(group)), vec![hip]);
    assert_eq!(scene.children(None), vec![group]);
    assert_eq!(scene.nodes_of_type(NodeType::Joint), vec![hip, knee]);

    scene.set_parent(knee, None).unwrap();
    assert_eq!(scene.full_path(knee).as_deref(), Some("|knee"));
    assert!(scene.children(Some(hip)).is_empty());
}

#[test]
fn find_node_by_short_name_and_full_path() {
    let mut scene = MemoryScene::new();
    let a = scene.create_transform("a", None).unwrap();
    let b = scene.create_transform("b", None).unwrap();
    let under_a = scene.create_joint("bone", Some(a)).unwrap();
    let under_b = scene.create_joint("bone", Some(b)).unwrap();

    assert_eq!(scene.find_node("a").unwrap(), Some(a));
    assert_eq!(scene.find_node("missing").unwrap(), None);
    assert_eq!(scene.find_node("|a|bone").unwrap(), Some(under_a));
    assert_eq!(scene.find_node("|b|bone").unwrap(), Some(under_b));
    assert_eq!(
        scene.find_node("bone"),
        Err(HostError::NameConflict {
            name: "bone".to_string()
        })
    );
}

#[test]
fn parenting_rejects_cycles() {
    let mut scene = MemoryScene::new();
    let a = scene.create_joint("a", None).unwrap();
    let b = scene.create_joint("b", Some(a)).unwrap();
    let c = scene.create_joint("c", Some(b)).unwrap();

    assert!(matches!(
        scene.set_parent(a, Some(c)),
        Err(HostError::InvalidParent { .. })
    ));
    assert!(matches!(
        scene.set_parent(a, Some(a)),
        Err(HostError::InvalidParent { .. })
    ));
    assert_eq!(scene.parent(a), None);
}

#[test]
fn joint_orient_only_exists_on_joints() {
    let mut scene = MemoryScene::new();
    let group = scene.create_transform("group", None).unwrap();
    let joint = scene.create_joint("joint", Some(group)).unwrap();
    let orient = Quat::from_rotation_y(0.3);

    scene.set_joint_orient(joint, orient).unwrap();
    assert_eq!(scene.joint_orient(joint).unwrap(), orient);
    assert!(scene.set_joint_orient(group, orient).is_err());
    assert!(scene.segment_scale_compensate(joint).unwrap());
}

#[test]
fn create_mesh_validates_faces() {
    let mut scene = MemoryScene::new();
    let parent = scene.create_transform("mesh", None).unwrap();

    let mut bad = triangle();
    bad.faces.push(0);
    assert!(scene.create_mesh("meshShape", parent, bad).is_err());

    let mut out_of_range = triangle();
    out_of_range.faces[2] = 9;
    assert!(scene.create_mesh("meshShape", parent, out_of_range).is_err());

    let shape = scene.create_mesh("meshShape", parent, triangle()).unwrap();
    assert_eq!(scene.mesh(shape).unwrap().geometry.face_count(), 1);
    assert_eq!(scene.node_type(shape), Some(NodeType::Mesh));
}

#[test]
fn shading_groups_and_materials() {
    let mut scene = MemoryScene::new();
    assert!(scene.has_shading_group(DEFAULT_SHADING_GROUP));

    let desc = MaterialDesc {
        name: "metal".to_string(),
        kind: MaterialKind::Phong,
        textures: Vec::new(),
    };
    assert_eq!(scene.create_material(&desc).unwrap(), "metalSG");
    assert!(scene.create_material(&desc).is_err());

    let parent = scene.create_transform("mesh", None).unwrap();
    let shape = scene.create_mesh("meshShape", parent, triangle()).unwrap();
    assert!(scene.assign_shading_group(shape, "missingSG").is_err());
    scene.assign_shading_group(shape, "metalSG").unwrap();
    assert_eq!(
        scene.mesh(shape).unwrap().shading_group.as_deref(),
        Some("metalSG")
    );
}

#[test]
fn skin_weights_fill_missing_slots_with_zero() {
    let mut scene = MemoryScene::new();
    let a = scene.create_joint("a", None).unwrap();
    let b = scene.create_joint("b", Some(a)).unwrap();
    let parent = scene.create_transform("mesh", None).unwrap();
    let shape = scene.create_mesh("meshShape", parent, triangle()).unwrap();

    let skin = scene
        .create_skin(shape, &[a, b], 2, SkinningMethod::Linear)
        .unwrap();
    scene.set_skin_weights(skin, 1, &[0.5]).unwrap();
    assert!(scene.set_skin_weights(skin, 3, &[1.0]).is_err());
    assert!(scene.set_skin_weights(skin, 0, &[0.1, 0.2, 0.7]).is_err());

    let data = scene.skin(skin).unwrap();
    assert_eq!(data.weights.len(), 3);
    assert_eq!(data.weights[1], vec![0.5, 0.0]);
}

#[test]
fn curves_interpolate_hold_and_clamp() {
    let mut scene = MemoryScene::new();
    let node = scene.create_joint("bone", None).unwrap();
    let curve = scene.create_curve(node, Channel::TranslateX).unwrap();
    assert!(scene.create_curve(node, Channel::TranslateX).is_err());

    scene
        .add_keys(curve, &[0.0, 10.0], &[0.0, 5.0], TangentType::Linear)
        .unwrap();
    assert_approx(scene.evaluate_curve(curve, 5.0).unwrap(), 2.5);
    assert_approx(scene.evaluate_curve(curve, -3.0).unwrap(), 0.0);
    assert_approx(scene.evaluate_curve(curve, 30.0).unwrap(), 5.0);

    scene
        .add_keys(curve, &[10.0, 20.0], &[8.0, 2.0], TangentType::Stepped)
        .unwrap();
    assert_eq!(scene.keyed_frames(node, Channel::TranslateX), vec![0.0, 10.0, 20.0]);
    assert_approx(scene.evaluate_curve(curve, 15.0).unwrap(), 8.0);
    assert_approx(scene.sample_channel(node, Channel::TranslateX, 20.0).unwrap(), 2.0);

    assert!(scene.add_keys(curve, &[1.0], &[], TangentType::Linear).is_err());
}

#[test]
fn unkeyed_channels_sample_the_static_value() {
    let mut scene = MemoryScene::new();
    let node = scene.create_joint("bone", None).unwrap();
    scene
        .set_transform(
            node,
            Transform {
                translate: Vec3::new(1.0, 2.0, 3.0),
                ..Transform::IDENTITY
            },
        )
        .unwrap();
    assert_approx(scene.sample_channel(node, Channel::TranslateY, 7.0).unwrap(), 2.0);
    assert_approx(scene.sample_channel(node, Channel::ScaleZ, 7.0).unwrap(), 1.0);
    assert_approx(scene.sample_channel(node, Channel::Visibility, 0.0).unwrap(), 1.0);

    let curve = scene.create_curve(node, Channel::TranslateY).unwrap();
    assert_approx(scene.evaluate_curve(curve, 0.0).unwrap(), 2.0);

    scene.set_visibility(node, false).unwrap();
    assert_approx(scene.sample_channel(node, Channel::Visibility, 0.0).unwrap(), 0.0);
}

#[test]
fn deleting_curves_invalidates_handles() {
    let mut scene = MemoryScene::new();
    let node = scene.create_joint("bone", None).unwrap();
    let curve = scene.create_curve(node, Channel::RotateX).unwrap();
    scene
        .set_curve_interpolation(curve, RotationInterpolation::Quaternion)
        .unwrap();
    assert_eq!(scene.curve_interpolation(curve), RotationInterpolation::Quaternion);

    scene.delete_all_curves();
    assert_eq!(scene.find_curve(node, Channel::RotateX), None);
    assert_eq!(
        scene.evaluate_curve(curve, 0.0),
        Err(HostError::InvalidCurve { id: curve.0 })
    );
    assert_eq!(scene.curves().count(), 0);
}

#[test]
fn instances_remember_their_source() {
    let mut scene = MemoryScene::new();
    let source = scene.create_transform("crate", None).unwrap();
    let instance = scene.create_instance(source, "crate_01").unwrap();
    assert_eq!(scene.instance_source(instance), Some(source));
    assert_eq!(scene.node_type(instance), Some(NodeType::Instance));
}

#[test]
fn playback_and_notification_storage() {
    let mut scene = MemoryScene::new();
    assert_eq!(scene.playback().end, 1.0);
    scene.set_playback_range(5.0, 40.0);
    scene.set_current_time(5.0);
    let playback = scene.playback();
    assert_eq!((playback.start, playback.end, playback.current), (5.0, 40.0, 5.0));

    assert_eq!(scene.notification_data(), None);
    scene.set_notification_data("{}").unwrap();
    assert_eq!(scene.notification_data().as_deref(), Some("{}"));
    scene.clear_notification_data();
    assert_eq!(scene.notification_data(), None);
}
