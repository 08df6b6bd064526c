use crate::{
    AnimationMut, BlendMode, CastFile, Channel, CurveProperty, FrameRange, MemoryScene,
    NodeId, PlaybackMode, Root, RotationInterpolation, SceneHost, Session, Settings, TimeUnit,
    Transform, import_animation,
};
use glam::{Quat, Vec3};

fn assert_approx(actual: f64, expected: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-5,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn animation(build: impl FnOnce(&mut AnimationMut<'_>)) -> CastFile {
    let mut file = CastFile::new();
    let mut root = file.create_root();
    let mut animation = root.create_animation();
    build(&mut animation);
    file
}

fn run(scene: &mut MemoryScene, session: &mut Session, file: &CastFile) {
    let root = Root::new(&file.roots()[0]).expect("root view");
    for animation in root.animations() {
        import_animation(scene, session, &animation);
    }
}

fn scene_with_bone(transform: Transform) -> (MemoryScene, NodeId) {
    let mut scene = MemoryScene::new();
    let group = scene.create_transform("Joints", None).unwrap();
    let bone = scene.create_joint("bone", Some(group)).unwrap();
    scene.set_transform(bone, transform).unwrap();
    (scene, bone)
}

fn translated(x: f32) -> Transform {
    Transform {
        translate: Vec3::new(x, 0.0, 0.0),
        ..Transform::IDENTITY
    }
}

fn sample(scene: &MemoryScene, node: NodeId, channel: Channel, frame: f64) -> f64 {
    scene.sample_channel(node, channel, frame).unwrap()
}

#[test]
fn property_keys_and_modes() {
    assert_eq!(CurveProperty::from_key("rq"), Some(CurveProperty::RotationQuaternion));
    assert_eq!(CurveProperty::from_key("vb"), Some(CurveProperty::Visibility));
    assert_eq!(CurveProperty::from_key("rx"), None);
    assert_eq!(CurveProperty::ScaleY.key(), "sy");
    assert_eq!(CurveProperty::RotationQuaternion.channels(), Channel::ROTATION);

    assert_eq!(BlendMode::from_name(None), Some(BlendMode::Absolute));
    assert_eq!(BlendMode::from_name(Some("additive")), Some(BlendMode::Additive));
    assert_eq!(BlendMode::from_name(Some("relative")), Some(BlendMode::Relative));
    assert_eq!(BlendMode::from_name(Some("overlay")), None);
}

#[test]
fn frame_range_tracks_extremes() {
    let mut range = FrameRange::default();
    assert_eq!(range.start(), 0.0);
    range.include(12.0);
    range.include(4.0);
    assert_eq!(range.smallest, Some(4.0));
    assert_eq!(range.largest, 12.0);
}

#[test]
fn absolute_translation_keys() {
    let (mut scene, bone) = scene_with_bone(translated(5.0));
    let file = animation(|animation| {
        animation
            .create_curve()
            .set_node_name("bone")
            .set_key_property_name("tx")
            .set_key_frame_buffer(&[0, 10])
            .set_float_key_value_buffer(vec![1.0, 3.0]);
    });
    let mut session = Session::default();
    run(&mut scene, &mut session, &file);

    assert_approx(sample(&scene, bone, Channel::TranslateX, 5.0), 2.0);
    assert_eq!(scene.keyed_frames(bone, Channel::TranslateX), vec![0.0, 10.0]);
    assert_eq!(session.rest_poses.get("|Joints|bone"), Some(&translated(5.0)));
}

#[test]
fn additive_keys_blend_onto_the_existing_value() {
    for (weight, expected) in [(1.0, 7.0), (0.0, 5.0), (0.5, 6.0)] {
        let (mut scene, bone) = scene_with_bone(translated(5.0));
        let file = animation(|animation| {
            animation
                .create_curve()
                .set_node_name("bone")
                .set_key_property_name("tx")
                .set_key_frame_buffer(&[0])
                .set_float_key_value_buffer(vec![2.0])
                .set_mode("additive")
                .set_additive_blend_weight(weight);
        });
        run(&mut scene, &mut Session::default(), &file);
        assert_approx(sample(&scene, bone, Channel::TranslateX, 0.0), expected);
    }
}

#[test]
fn relative_keys_offset_the_rest_pose() {
    let rest = Transform {
        translate: Vec3::new(3.0, 0.0, 0.0),
        rotate: Vec3::new(0.0, 0.0, 0.5),
        scale: Vec3::ONE,
    };
    let (mut scene, bone) = scene_with_bone(rest);
    let file = animation(|animation| {
        animation
            .create_curve()
            .set_node_name("bone")
            .set_key_property_name("tx")
            .set_key_frame_buffer(&[0])
            .set_float_key_value_buffer(vec![2.0])
            .set_mode("relative");
        animation
            .create_curve()
            .set_node_name("bone")
            .set_key_property_name("rq")
            .set_key_frame_buffer(&[0])
            .set_vec4_key_value_buffer(vec![Quat::from_rotation_z(0.25).to_array()])
            .set_mode("relative");
    });
    run(&mut scene, &mut Session::default(), &file);

    assert_approx(sample(&scene, bone, Channel::TranslateX, 0.0), 5.0);
    assert_approx(sample(&scene, bone, Channel::RotateZ, 0.0), 0.75);
    assert_approx(sample(&scene, bone, Channel::RotateX, 0.0), 0.0);
}

#[test]
fn quaternion_curves_key_all_three_rotation_channels() {
    let (mut scene, bone) = scene_with_bone(Transform::IDENTITY);
    let file = animation(|animation| {
        animation
            .create_curve()
            .set_node_name("bone")
            .set_key_property_name("rq")
            .set_key_frame_buffer(&[0, 10])
            .set_vec4_key_value_buffer(vec![
                Quat::IDENTITY.to_array(),
                Quat::from_rotation_x(0.5).to_array(),
            ]);
    });
    run(&mut scene, &mut Session::default(), &file);

    for channel in Channel::ROTATION {
        let curve = scene.find_curve(bone, channel).expect("rotation curve");
        assert_eq!(scene.curve_interpolation(curve), RotationInterpolation::Quaternion);
        assert_eq!(scene.keyed_frames(bone, channel), vec![0.0, 10.0]);
    }
    assert_approx(sample(&scene, bone, Channel::RotateX, 10.0), 0.5);
    assert_approx(sample(&scene, bone, Channel::RotateY, 10.0), 0.0);
}

#[test]
fn additive_rotation_applies_on_top_of_the_current_pose() {
    let rest = Transform {
        rotate: Vec3::new(0.0, 0.0, 0.5),
        ..Transform::IDENTITY
    };
    let (mut scene, bone) = scene_with_bone(rest);
    let file = animation(|animation| {
        animation
            .create_curve()
            .set_node_name("bone")
            .set_key_property_name("rq")
            .set_key_frame_buffer(&[0])
            .set_vec4_key_value_buffer(vec![Quat::from_rotation_z(0.25).to_array()])
            .set_mode("additive");
    });
    run(&mut scene, &mut Session::default(), &file);
    assert_approx(sample(&scene, bone, Channel::RotateZ, 0.0), 0.75);
}

#[test]
fn visibility_keys_from_bytes() {
    let (mut scene, bone) = scene_with_bone(Transform::IDENTITY);
    let file = animation(|animation| {
        animation
            .create_curve()
            .set_node_name("bone")
            .set_key_property_name("vb")
            .set_key_frame_buffer(&[0, 4])
            .set_byte_key_value_buffer(vec![1, 0]);
    });
    run(&mut scene, &mut Session::default(), &file);
    assert_approx(sample(&scene, bone, Channel::Visibility, 4.0), 0.0);
}

#[test]
fn playback_follows_the_imported_span() {
    let (mut scene, _) = scene_with_bone(Transform::IDENTITY);
    scene.set_auto_key(true);
    let file = animation(|animation| {
        animation.set_framerate(30.0).set_looping(true);
        animation
            .create_curve()
            .set_node_name("bone")
            .set_key_property_name("ty")
            .set_key_frame_buffer(&[5, 20])
            .set_float_key_value_buffer(vec![0.0, 1.0]);
    });
    run(&mut scene, &mut Session::default(), &file);

    let playback = scene.playback();
    assert_eq!(playback.unit, TimeUnit::Ntsc);
    assert_eq!(playback.mode, PlaybackMode::Loop);
    assert_eq!((playback.start, playback.end, playback.current), (5.0, 20.0, 5.0));
    assert!(!playback.auto_key);
}

#[test]
fn import_at_time_offsets_keys() {
    let (mut scene, bone) = scene_with_bone(Transform::IDENTITY);
    scene.set_current_time(100.0);
    let file = animation(|animation| {
        animation
            .create_curve()
            .set_node_name("bone")
            .set_key_property_name("sz")
            .set_key_frame_buffer(&[0, 10])
            .set_float_key_value_buffer(vec![1.0, 2.0]);
    });
    let mut settings = Settings::default();
    settings.import_at_time = true;
    run(&mut scene, &mut Session::new(settings), &file);

    assert_eq!(scene.keyed_frames(bone, Channel::ScaleZ), vec![100.0, 110.0]);
    let playback = scene.playback();
    assert_eq!((playback.start, playback.end), (100.0, 110.0));
}

#[test]
fn missing_nodes_are_skipped_and_conflicts_warn() {
    let (mut scene, _) = scene_with_bone(Transform::IDENTITY);
    scene.create_joint("bone", None).unwrap();
    let file = animation(|animation| {
        for node in ["ghost", "bone"] {
            animation
                .create_curve()
                .set_node_name(node)
                .set_key_property_name("tx")
                .set_key_frame_buffer(&[0])
                .set_float_key_value_buffer(vec![1.0]);
        }
        animation
            .create_curve()
            .set_node_name("|Joints|bone")
            .set_key_property_name("tx")
            .set_key_frame_buffer(&[0])
            .set_float_key_value_buffer(vec![4.0])
            .set_mode("overlay");
    });
    run(&mut scene, &mut Session::default(), &file);

    assert_eq!(scene.curves().count(), 0);
    assert_eq!(scene.warnings().len(), 2);
    assert_eq!(
        scene.warnings()[0],
        "Unable to animate bone[translateX] due to a name conflict in the scene"
    );
    assert!(scene.warnings()[1].contains("overlay"));
    let playback = scene.playback();
    assert_eq!((playback.start, playback.end), (0.0, 1.0));
}

#[test]
fn reset_restores_rest_poses_before_importing() {
    let (mut scene, bone) = scene_with_bone(translated(1.0));
    let first = animation(|animation| {
        animation
            .create_curve()
            .set_node_name("bone")
            .set_key_property_name("tx")
            .set_key_frame_buffer(&[0, 50])
            .set_float_key_value_buffer(vec![8.0, 9.0]);
    });
    let mut session = Session::default();
    run(&mut scene, &mut session, &first);
    scene.set_transform(bone, translated(9.0)).unwrap();

    let second = animation(|animation| {
        animation
            .create_curve()
            .set_node_name("bone")
            .set_key_property_name("ty")
            .set_key_frame_buffer(&[0])
            .set_float_key_value_buffer(vec![2.0]);
    });
    session.settings.import_reset = true;
    run(&mut scene, &mut session, &second);

    assert_eq!(scene.find_curve(bone, Channel::TranslateX), None);
    assert_approx(sample(&scene, bone, Channel::TranslateX, 50.0), 1.0);
    assert_approx(sample(&scene, bone, Channel::TranslateY, 0.0), 2.0);
    assert_eq!(session.rest_poses.len(), 1);
}

#[test]
fn notifications_merge_into_the_scene_store() {
    let (mut scene, _) = scene_with_bone(Transform::IDENTITY);
    scene.set_notification_data(r#"{"step":[2]}"#).unwrap();
    let file = animation(|animation| {
        animation
            .create_notification()
            .set_name("hit")
            .set_key_frame_buffer(&[3, 30]);
        animation
            .create_notification()
            .set_name("step")
            .set_key_frame_buffer(&[2, 8]);
    });
    let mut session = Session::default();
    run(&mut scene, &mut session, &file);

    assert_eq!(
        session.notifications.sorted(),
        vec![(2, "step"), (3, "hit"), (8, "step"), (30, "hit")]
    );
    assert_eq!(
        scene.notification_data().as_deref(),
        Some(r#"{"hit":[3,30],"step":[2,8]}"#)
    );
    let playback = scene.playback();
    assert_eq!((playback.start, playback.end), (2.0, 30.0));
}
