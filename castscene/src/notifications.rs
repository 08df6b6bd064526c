//! Named animation event markers shared by import and export.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Error, SceneHost};

/// Name to frame-set map. Frames are unique per name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationStore {
    tracks: BTreeMap<String, BTreeSet<i32>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the frame was not already stored under `name`.
    pub fn add(&mut self, name: &str, frame: i32) -> bool {
        self.tracks.entry(name.to_string()).or_default().insert(frame)
    }

    pub fn remove(&mut self, name: &str, frame: i32) -> bool {
        let Some(frames) = self.tracks.get_mut(name) else {
            return false;
        };
        let removed = frames.remove(&frame);
        if frames.is_empty() {
            self.tracks.remove(name);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> impl Iterator<Item = (&str, &BTreeSet<i32>)> {
        self.tracks.iter().map(|(name, frames)| (name.as_str(), frames))
    }

    pub fn frames(&self, name: &str) -> Option<&BTreeSet<i32>> {
        self.tracks.get(name)
    }

    /// Every marker as `(frame, name)`, ordered by frame then name.
    pub fn sorted(&self) -> Vec<(i32, &str)> {
        let mut markers: Vec<(i32, &str)> = self
            .tracks
            .iter()
            .flat_map(|(name, frames)| frames.iter().map(move |f| (*f, name.as_str())))
            .collect();
        markers.sort_unstable();
        markers
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(&self.tracks).map_err(|e| Error::NotificationParse {
            message: e.to_string(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self, Error> {
        let tracks: BTreeMap<String, BTreeSet<i32>> =
            serde_json::from_str(text).map_err(|e| Error::NotificationParse {
                message: e.to_string(),
            })?;
        Ok(Self { tracks })
    }

    /// Replaces the store with the scene's persisted copy, if it has one.
    pub fn load_from(&mut self, host: &dyn SceneHost) -> Result<(), Error> {
        if let Some(text) = host.notification_data() {
            self.tracks = Self::from_json(&text)?.tracks;
        }
        Ok(())
    }

    pub fn store_to(&self, host: &mut dyn SceneHost) -> Result<(), Error> {
        host.set_notification_data(&self.to_json()?)?;
        Ok(())
    }
}
