use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::host::{Progress, report};
use crate::{
    CastFile, DocumentSource, MeshPlan, Model, NodeId, NodeType, Root, SceneHost, Session,
    SkeletonPlan, export_animation, export_model, group_instances, import_animation,
    import_blend_shapes, import_constraints, import_ik_handles, import_instances, import_material,
};

#[cfg(feature = "binary")]
use crate::{Error, FileSource};

/// Nested instance scenes deeper than this are not followed.
pub const MAX_INSTANCE_DEPTH: usize = 8;

#[derive(Clone, Debug, Default)]
pub struct ImportOptions {
    /// Directory instance references resolve against. Defaults to the document's directory.
    pub instance_root: Option<PathBuf>,
}

fn document_stem(document: &Path) -> String {
    document
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Builds one model: skeleton, materials, meshes and skin, blend shapes, then IK and constraints.
pub fn import_model(
    host: &mut dyn SceneHost,
    session: &mut Session,
    model: &Model<'_>,
    document: &Path,
) {
    let skeleton = model.skeleton();
    let instance = match skeleton.map(|skeleton| SkeletonPlan::from_skeleton(&skeleton).apply(host)) {
        Some(Ok(instance)) => Some(instance),
        Some(Err(e)) => {
            report(host, format!("Unable to build skeleton: {e}"));
            None
        }
        None => None,
    };

    let shading_groups: HashMap<u64, String> = model
        .materials()
        .iter()
        .filter_map(|material| {
            import_material(host, material, document).map(|group| (material.hash(), group))
        })
        .collect();

    let group_name = model
        .name()
        .map_or_else(|| document_stem(document), str::to_string);
    let group = match host.create_transform(&group_name, None) {
        Ok(group) => group,
        Err(e) => {
            report(host, format!("Unable to create model {group_name}: {e}"));
            return;
        }
    };

    let meshes = model.meshes();
    Progress::begin(host, "Importing meshes...", meshes.len());
    let mut shapes: HashMap<u64, NodeId> = HashMap::with_capacity(meshes.len());
    for mesh in &meshes {
        let plan = MeshPlan::from_mesh(mesh);
        if let Some(shape) = plan.apply(
            host,
            group,
            instance.as_ref(),
            &shading_groups,
            session.settings.import_skin,
        ) {
            shapes.insert(plan.hash, shape);
        }
        Progress::step(host);
    }
    Progress::end(host);

    import_blend_shapes(host, &model.blend_shapes(), &shapes);

    if let (Some(skeleton), Some(instance)) = (skeleton, instance.as_ref()) {
        if session.settings.import_ik {
            import_ik_handles(host, &skeleton, instance);
        }
        if session.settings.import_constraints {
            import_constraints(host, &skeleton, instance);
        }
    }
    log::debug!("imported model {group_name} with {} meshes", shapes.len());
}

/// Imports every model and animation of `file`, then its instances.
pub fn import_document(
    host: &mut dyn SceneHost,
    session: &mut Session,
    file: &CastFile,
    document: &Path,
    source: &mut dyn DocumentSource,
    options: &ImportOptions,
) {
    import_document_at(host, session, file, document, source, options, 0);
}

fn import_document_at(
    host: &mut dyn SceneHost,
    session: &mut Session,
    file: &CastFile,
    document: &Path,
    source: &mut dyn DocumentSource,
    options: &ImportOptions,
    depth: usize,
) {
    let mut has_instances = false;
    for root in file.roots().iter().filter_map(Root::new) {
        for model in root.models() {
            import_model(host, session, &model, document);
        }
        for animation in root.animations() {
            import_animation(host, session, &animation);
        }
        has_instances |= !root.instances().is_empty();
    }
    if !has_instances {
        return;
    }
    if depth >= MAX_INSTANCE_DEPTH {
        report(
            host,
            format!("Instances of {} are nested too deeply, skipping", document.display()),
        );
        return;
    }

    let instance_root = options
        .instance_root
        .clone()
        .or_else(|| document.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let (groups, issues) = group_instances(file, &instance_root);
    for issue in issues {
        report(host, issue);
    }

    let mut nested = |host: &mut dyn SceneHost,
                      source: &mut dyn DocumentSource,
                      file: &CastFile,
                      path: &Path| {
        import_document_at(host, session, file, path, source, options, depth + 1);
    };
    if let Err(e) = import_instances(host, document, groups, source, &mut nested) {
        report(host, format!("Unable to import instances: {e}"));
    }
}

/// Loads and imports a Cast file. Only failing to read the file is an error.
#[cfg(feature = "binary")]
pub fn import_file(
    host: &mut dyn SceneHost,
    session: &mut Session,
    path: impl AsRef<Path>,
    options: &ImportOptions,
) -> Result<(), Error> {
    let path = path.as_ref();
    let file = CastFile::load(path)?;
    log::debug!("importing {}", path.display());
    import_document(host, session, &file, path, &mut FileSource, options);
    Ok(())
}

fn exported_joints(host: &dyn SceneHost, selection: Option<&[NodeId]>) -> Vec<NodeId> {
    host.nodes_of_type(NodeType::Joint)
        .into_iter()
        .filter(|joint| selection.is_none_or(|selected| selected.contains(joint)))
        .collect()
}

/// Serializes the scene's joints and their animation into a new document.
///
/// `selection` restricts export to the given nodes.
pub fn export_document(
    host: &mut dyn SceneHost,
    session: &mut Session,
    selection: Option<&[NodeId]>,
) -> CastFile {
    let joints = exported_joints(host, selection);
    let mut file = CastFile::new();
    let mut root = file.create_root();
    if session.settings.export_anim {
        export_animation(host, session, &mut root, &joints);
    }
    if session.settings.export_model {
        export_model(host, &mut root, &joints);
    }
    file
}

#[cfg(feature = "binary")]
pub fn export_file(
    host: &mut dyn SceneHost,
    session: &mut Session,
    path: impl AsRef<Path>,
    selection: Option<&[NodeId]>,
) -> Result<(), Error> {
    let file = export_document(host, session, selection);
    file.save(path)
}
