use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::autosave::DEFAULT_AUTOSAVE_DELAY;
use crate::error::JournalError;
use crate::model::BlockKind;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Non-secret editor preferences, stored in plain JSON next to the blob.
/// Key derivation parameters are deliberately not configurable here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalSettings {
    pub autosave_delay_ms: u64,
    pub default_block_kind: BlockKind,
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY.as_millis() as u64,
            default_block_kind: BlockKind::Verse,
        }
    }
}

impl JournalSettings {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Read `settings.json` from `dir`, falling back to defaults when absent.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, JournalError> {
        let path = dir.as_ref().join(SETTINGS_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read(&path)
            .map_err(|e| JournalError::Settings(format!("read {}: {e}", path.display())))?;
        serde_json::from_slice(&data)
            .map_err(|e| JournalError::Settings(format!("parse {}: {e}", path.display())))
    }

    pub fn save_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<(), JournalError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| JournalError::Settings(e.to_string()))?;
        let data =
            serde_json::to_vec_pretty(self).map_err(|e| JournalError::Settings(e.to_string()))?;
        std::fs::write(dir.join(SETTINGS_FILE_NAME), data)
            .map_err(|e| JournalError::Settings(e.to_string()))
    }
}
