use std::collections::HashMap;

use crate::host::report;
use crate::{HostError, NodeId, SceneHost, Transform};

/// Original transforms of animated nodes, keyed by full scene path.
///
/// A snapshot is taken the first time a node is saved and never refreshed until
/// [`RestPoseCache::clear`], so repeated curve lookups cannot capture an animated pose.
#[derive(Clone, Debug, Default)]
pub struct RestPoseCache {
    entries: HashMap<String, Transform>,
}

impl RestPoseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Transform> {
        self.entries.get(path)
    }

    /// Returns the cached snapshot for `node`, taking it from the live scene on first use.
    pub fn save(&mut self, host: &dyn SceneHost, node: NodeId) -> Result<Transform, HostError> {
        let path = host
            .full_path(node)
            .ok_or(HostError::InvalidNode { id: node.0 })?;
        if let Some(rest) = self.entries.get(&path) {
            return Ok(*rest);
        }
        let rest = host.transform(node)?;
        self.entries.insert(path, rest);
        Ok(rest)
    }

    /// Re-applies the snapshot for `path`. Missing entries are a no-op.
    pub fn restore(&self, host: &mut dyn SceneHost, path: &str) {
        let Some(rest) = self.entries.get(path) else {
            return;
        };
        let node = match host.find_node(path) {
            Ok(Some(node)) => node,
            Ok(None) => {
                report(host, format!("Unable to restore rest pose of missing node {path}"));
                return;
            }
            Err(e) => {
                report(host, format!("Unable to restore rest pose of {path}: {e}"));
                return;
            }
        };
        if let Err(e) = host.set_transform(node, *rest) {
            report(host, format!("Unable to restore rest pose of {path}: {e}"));
        }
    }

    pub fn restore_all(&self, host: &mut dyn SceneHost) {
        let mut paths: Vec<&String> = self.entries.keys().collect();
        paths.sort();
        for path in paths {
            self.restore(host, path);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
