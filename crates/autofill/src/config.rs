//! Persistent fill settings.
//!
//! `JsonFileStore` keeps the settings as one JSON file under the platform
//! config directory. A missing file reads as the defaults; nothing is
//! written until the first explicit save.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mrfill_core_types::FillConfig;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<FillConfig, ConfigError>;
    fn save(&self, config: &FillConfig) -> Result<(), ConfigError>;
}

/// JSON file in the platform config directory.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/mrfill/config.json`, falling back to the home
    /// directory when the platform reports no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mrfill")
            .join("config.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<FillConfig, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no config file, using defaults");
                Ok(FillConfig::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, config: &FillConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    config: Mutex<FillConfig>,
}

impl MemoryStore {
    pub fn new(config: FillConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<FillConfig, ConfigError> {
        Ok(self.config.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, config: &FillConfig) -> Result<(), ConfigError> {
        *self.config.lock().unwrap_or_else(|e| e.into_inner()) = config.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("config.json"));
        let config = store.load().unwrap();
        assert_eq!(config, FillConfig::default());
        assert!(!store.path().exists());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("config.json"));
        let config = FillConfig {
            enabled: true,
            assignee: "alice".into(),
            reviewers: vec!["bob".into()],
            labels: vec!["bug".into()],
        };
        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_silent_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(path);
        assert!(matches!(store.load(), Err(ConfigError::Parse(_))));
    }
}
