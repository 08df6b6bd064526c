use serde::{Deserialize, Serialize};
use std::path::Path;

/// Import and export toggles, persisted as a flat JSON object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub import_at_time: bool,
    pub import_skin: bool,
    pub import_reset: bool,
    #[serde(rename = "importIK")]
    pub import_ik: bool,
    pub import_constraints: bool,
    pub export_anim: bool,
    pub export_model: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            import_at_time: false,
            import_skin: true,
            import_reset: false,
            import_ik: true,
            import_constraints: true,
            export_anim: true,
            export_model: true,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reads settings from `path`. Anything unreadable yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::debug!("using default settings, cannot read '{}': {e}", path.display());
                return Self::default();
            }
        };
        Self::from_json(&text).unwrap_or_else(|e| {
            log::debug!("using default settings, cannot parse '{}': {e}", path.display());
            Self::default()
        })
    }

    /// Writes settings to `path`. Failures are logged and otherwise ignored.
    pub fn save(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let result = self
            .to_json()
            .map_err(std::io::Error::other)
            .and_then(|text| std::fs::write(path, text));
        if let Err(e) = result {
            log::warn!("failed to save settings to '{}': {e}", path.display());
        }
    }

    /// Sets a flag by its persisted key. Returns `false` for unknown keys.
    pub fn set(&mut self, key: &str, value: bool) -> bool {
        let flag = match key {
            "importAtTime" => &mut self.import_at_time,
            "importSkin" => &mut self.import_skin,
            "importReset" => &mut self.import_reset,
            "importIK" => &mut self.import_ik,
            "importConstraints" => &mut self.import_constraints,
            "exportAnim" => &mut self.export_anim,
            "exportModel" => &mut self.export_model,
            _ => return false,
        };
        *flag = value;
        true
    }
}
