use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use wabridge_common::{Error, Result};

/// The Chatwoot credential record, stored as JSON and editable at runtime
/// through the config UI endpoints. Field names on the wire are camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatwootConfig {
    pub base_url: String,
    pub account_id: u64,
    pub inbox_id: u64,
    pub api_token: String,
}

/// File-backed store for [`ChatwootConfig`].
///
/// Reads go back to disk on every call so a config saved through the UI takes
/// effect on the next inbound event without a restart. An absent file is the
/// normal not-yet-configured state, not an error.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            path: config_dir.as_ref().join("chatwoot.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current record, distinguishing "absent" from "unreadable".
    pub fn try_read(&self) -> Result<Option<ChatwootConfig>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("malformed {}: {e}", self.path.display())))?;
        Ok(Some(config))
    }

    /// Read the current record, degrading any failure to "not configured".
    /// This is the accessor remote operations use: a broken credentials file
    /// must silence the bridge, not crash an event handler.
    pub fn read(&self) -> Option<ChatwootConfig> {
        match self.try_read() {
            Ok(config) => config,
            Err(e) => {
                warn!("chatwoot config unreadable, treating as unconfigured: {e}");
                None
            }
        }
    }

    /// Replace the record wholesale, creating the parent directory if needed.
    pub fn write(&self, config: &ChatwootConfig) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
