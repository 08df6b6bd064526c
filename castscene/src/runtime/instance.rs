use glam::{Quat, Vec3};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::host::report;
use crate::math::quat_to_euler;
use crate::{CastFile, Error, HostError, NodeId, NodeType, Root, SceneHost, Transform};

pub const DEFAULT_INSTANCE_NAME: &str = "CastInstance";

/// Supplies the documents that instances reference.
pub trait DocumentSource {
    fn load(&mut self, path: &Path) -> Result<CastFile, Error>;
}

impl<F> DocumentSource for F
where
    F: FnMut(&Path) -> Result<CastFile, Error>,
{
    fn load(&mut self, path: &Path) -> Result<CastFile, Error> {
        self(path)
    }
}

impl DocumentSource for BTreeMap<PathBuf, CastFile> {
    fn load(&mut self, path: &Path) -> Result<CastFile, Error> {
        self.get(path).cloned().ok_or_else(|| Error::Io {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

/// Reads referenced documents from disk.
#[cfg(feature = "binary")]
#[derive(Copy, Clone, Debug, Default)]
pub struct FileSource;

#[cfg(feature = "binary")]
impl DocumentSource for FileSource {
    fn load(&mut self, path: &Path) -> Result<CastFile, Error> {
        CastFile::load(path)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstancePlacement {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

/// Placements grouped by the resolved path of the scene they reference.
pub fn group_instances(
    file: &CastFile,
    instance_root: &Path,
) -> (BTreeMap<PathBuf, Vec<InstancePlacement>>, Vec<String>) {
    let mut groups: BTreeMap<PathBuf, Vec<InstancePlacement>> = BTreeMap::new();
    let mut issues = Vec::new();
    for root in file.roots().iter().filter_map(Root::new) {
        for instance in root.instances() {
            let name = instance.name().unwrap_or(DEFAULT_INSTANCE_NAME).to_string();
            let Some(reference) = instance
                .reference_file()
                .and_then(|hash| root.file_by_hash(hash))
                .and_then(|file| file.path())
            else {
                issues.push(format!("Instance {name} has no reference file, skipping"));
                continue;
            };
            groups
                .entry(instance_root.join(reference))
                .or_default()
                .push(InstancePlacement {
                    name,
                    position: instance.position(),
                    rotation: instance.rotation(),
                    scale: instance.scale(),
                });
        }
    }
    (groups, issues)
}

fn scene_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Imports each referenced scene once and places one instance of it per placement.
///
/// `import` builds a loaded document into the host. The sources end up hidden under
/// `{name}_scenes`, the placements under `{name}_instances`. Only failing to create those two
/// groups is an error; anything after that is reported and skipped.
pub fn import_instances(
    host: &mut dyn SceneHost,
    document: &Path,
    groups: BTreeMap<PathBuf, Vec<InstancePlacement>>,
    source: &mut dyn DocumentSource,
    import: &mut dyn FnMut(&mut dyn SceneHost, &mut dyn DocumentSource, &CastFile, &Path),
) -> Result<(), Error> {
    let name = scene_stem(document);
    let scenes = host.create_transform(&format!("{name}_scenes"), None)?;
    let instances = host.create_transform(&format!("{name}_instances"), None)?;

    for (path, placements) in groups {
        let file = match source.load(&path) {
            Ok(file) => file,
            Err(e) => {
                report(
                    host,
                    format!(
                        "Instance: {} failed to import or not found, skipping... ({e})",
                        path.display()
                    ),
                );
                continue;
            }
        };

        let before: HashSet<NodeId> = host.children(None).into_iter().collect();
        import(host, source, &file, &path);
        let roots: Vec<NodeId> = host
            .children(None)
            .into_iter()
            .filter(|node| !before.contains(node))
            .filter(|node| host.node_type(*node) == Some(NodeType::Transform))
            .collect();

        let base = match roots.as_slice() {
            [] => {
                report(
                    host,
                    format!(
                        "Instance: {} imported nothing so there will be no instancing.",
                        path.display()
                    ),
                );
                continue;
            }
            [only] => *only,
            many => match group_roots(host, &path, many) {
                Ok(group) => group,
                Err(e) => {
                    report(
                        host,
                        format!("Instance: unable to group {}, skipping... ({e})", path.display()),
                    );
                    continue;
                }
            },
        };

        for placement in &placements {
            if let Err(e) = place_instance(host, base, instances, placement) {
                report(host, format!("Unable to instance {}: {e}", placement.name));
            }
        }
        if let Err(e) = host.set_parent(base, Some(scenes)) {
            report(
                host,
                format!("Instance: unable to stash {} under {name}_scenes: {e}", path.display()),
            );
        }
    }

    if let Err(e) = host.set_visibility(scenes, false) {
        report(host, format!("Unable to hide {name}_scenes: {e}"));
    }
    Ok(())
}

fn group_roots(
    host: &mut dyn SceneHost,
    path: &Path,
    roots: &[NodeId],
) -> Result<NodeId, HostError> {
    let group = host.create_transform(&format!("{}_scene", scene_stem(path)), None)?;
    for root in roots {
        host.set_parent(*root, Some(group))?;
    }
    Ok(group)
}

fn place_instance(
    host: &mut dyn SceneHost,
    base: NodeId,
    instances: NodeId,
    placement: &InstancePlacement,
) -> Result<(), HostError> {
    let node = host.create_instance(base, &placement.name)?;
    host.set_transform(
        node,
        Transform {
            translate: placement.position,
            rotate: quat_to_euler(placement.rotation),
            scale: placement.scale,
        },
    )?;
    host.set_parent(node, Some(instances))
}
