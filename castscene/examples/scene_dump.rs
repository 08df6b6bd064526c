use castscene::{ImportOptions, MemoryScene, NodeType, SceneHost, Session, Settings};
use serde_json::json;
use std::path::PathBuf;

fn main() {
    env_logger::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut positional = Vec::<String>::new();
    let mut settings_path: Option<PathBuf> = None;
    let mut export_path: Option<PathBuf> = None;
    let mut instance_root: Option<PathBuf> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--settings" => {
                settings_path = args.get(i + 1).map(PathBuf::from);
                i += 2;
            }
            "--export" => {
                export_path = args.get(i + 1).map(PathBuf::from);
                i += 2;
            }
            "--instance-root" => {
                instance_root = args.get(i + 1).map(PathBuf::from);
                i += 2;
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    let Some(path) = positional.first().map(PathBuf::from) else {
        eprintln!(
            "usage: scene_dump <file.cast> [--settings settings.json] [--instance-root dir] [--export out.cast]"
        );
        std::process::exit(2);
    };

    let settings = settings_path.map(Settings::load).unwrap_or_default();
    let mut session = Session::new(settings);
    let mut scene = MemoryScene::new();
    castscene::import_file(
        &mut scene,
        &mut session,
        &path,
        &ImportOptions { instance_root },
    )
    .expect("import cast file");

    let joints: Vec<_> = scene
        .nodes_of_type(NodeType::Joint)
        .into_iter()
        .map(|joint| {
            let transform = scene.transform(joint).expect("joint transform");
            json!({
                "path": scene.full_path(joint),
                "translate": transform.translate.to_array(),
                "rotate": transform.rotate.to_array(),
                "scale": transform.scale.to_array(),
            })
        })
        .collect();

    let meshes: Vec<_> = scene
        .nodes_of_type(NodeType::Mesh)
        .into_iter()
        .filter_map(|node| {
            let mesh = scene.mesh(node)?;
            Some(json!({
                "path": scene.full_path(node),
                "vertices": mesh.geometry.positions.len(),
                "faces": mesh.geometry.face_count(),
                "uvLayers": mesh.uv_layers.iter().map(|layer| layer.name.as_str()).collect::<Vec<_>>(),
                "shadingGroup": mesh.shading_group,
            }))
        })
        .collect();

    let curves: Vec<_> = scene
        .curves()
        .map(|curve| {
            json!({
                "node": scene.node_name(curve.node),
                "attribute": curve.channel.attribute_name(),
                "keys": curve.keys.len(),
            })
        })
        .collect();

    let playback = scene.playback();
    let out = json!({
        "file": path.display().to_string(),
        "nodes": scene.node_count(),
        "joints": joints,
        "meshes": meshes,
        "materials": scene.materials().iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
        "skins": scene.skins().len(),
        "blendShapes": scene.blend_shapes().len(),
        "ikHandles": scene.ik_handles().len(),
        "constraints": scene.constraints().len(),
        "curves": curves,
        "playback": {"start": playback.start, "end": playback.end, "fps": playback.unit.fps()},
        "notifications": scene.notification_data(),
        "warnings": scene.warnings(),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).expect("serialize summary")
    );

    if let Some(export_path) = export_path {
        castscene::export_file(&mut scene, &mut session, &export_path, None).expect("export cast file");
        eprintln!("wrote {}", export_path.display());
    }
}
