use crate::{NotificationStore, RestPoseCache, SceneHost, Settings};

/// State that outlives a single import or export call.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub settings: Settings,
    pub rest_poses: RestPoseCache,
    pub notifications: NotificationStore,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Removes all animation and puts every cached node back in its rest pose.
    pub fn reset_scene(&mut self, host: &mut dyn SceneHost) {
        log::debug!("resetting scene, {} cached rest poses", self.rest_poses.len());
        host.delete_all_curves();
        self.rest_poses.restore_all(host);
        self.rest_poses.clear();
    }
}
