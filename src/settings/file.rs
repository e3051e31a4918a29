//! JSON file settings store

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;

use super::SettingsStore;
use crate::config::Settings;

const SETTINGS_FILE: &str = "settings.json";

/// Settings persisted as a JSON object in a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at the default location (`<config dir>/paste-uploader/settings.json`)
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_path(Self::config_dir()?.join(SETTINGS_FILE)))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("paste-uploader"))
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn load(&self) -> anyhow::Result<Option<serde_json::Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(
                    "Ignoring malformed settings file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("writing {}", self.path.display()))
    }
}
