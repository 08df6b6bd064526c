use crate::{HostError, MemoryScene, NodeId, RestPoseCache, SceneHost, Transform};
use glam::Vec3;

fn posed(translate: Vec3) -> Transform {
    Transform {
        translate,
        ..Transform::IDENTITY
    }
}

#[test]
fn first_snapshot_wins() {
    let mut scene = MemoryScene::new();
    let group = scene.create_transform("Joints", None).unwrap();
    let bone = scene.create_joint("hip", Some(group)).unwrap();
    scene.set_transform(bone, posed(Vec3::X)).unwrap();

    let mut cache = RestPoseCache::new();
    assert_eq!(cache.save(&scene, bone).unwrap(), posed(Vec3::X));

    scene.set_transform(bone, posed(Vec3::Y)).unwrap();
    assert_eq!(cache.save(&scene, bone).unwrap(), posed(Vec3::X));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("|Joints|hip"), Some(&posed(Vec3::X)));
}

#[test]
fn restore_all_puts_nodes_back() {
    let mut scene = MemoryScene::new();
    let a = scene.create_joint("a", None).unwrap();
    let b = scene.create_joint("b", Some(a)).unwrap();
    scene.set_transform(b, posed(Vec3::Z)).unwrap();

    let mut cache = RestPoseCache::new();
    cache.save(&scene, a).unwrap();
    cache.save(&scene, b).unwrap();
    scene.set_transform(a, posed(Vec3::ONE)).unwrap();
    scene.set_transform(b, posed(Vec3::ONE)).unwrap();

    cache.restore_all(&mut scene);
    assert_eq!(scene.transform(a).unwrap(), Transform::IDENTITY);
    assert_eq!(scene.transform(b).unwrap(), posed(Vec3::Z));
    assert!(scene.warnings().is_empty());
}

#[test]
fn restoring_a_vanished_node_warns() {
    let mut scene = MemoryScene::new();
    let group = scene.create_transform("group", None).unwrap();
    let bone = scene.create_joint("bone", Some(group)).unwrap();

    let mut cache = RestPoseCache::new();
    cache.save(&scene, bone).unwrap();
    scene.set_parent(bone, None).unwrap();

    cache.restore(&mut scene, "|group|bone");
    assert_eq!(scene.warnings().len(), 1);
    assert!(scene.warnings()[0].contains("|group|bone"));

    cache.restore(&mut scene, "|never|cached");
    assert_eq!(scene.warnings().len(), 1);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn saving_an_unknown_node_is_an_error() {
    let scene = MemoryScene::new();
    let mut cache = RestPoseCache::new();
    assert!(matches!(
        cache.save(&scene, NodeId(7)),
        Err(HostError::InvalidNode { id: 7 })
    ));
    assert!(cache.is_empty());
}
