//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] over a single JSON file.
//!
//! - Missing file: defaults, so a fresh install runs without setup.
//! - Unparseable file: [`ConfigError::Corrupted`], never silently replaced.
//! - Saving validates first and writes atomically (temp file + rename).

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::NamedTempFile;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;

pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for FileConfigStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "FileConfigStore: no config at {}, using defaults",
                    self.path.display()
                );
                return Ok(SystemConfig::default());
            }
            Err(e) => {
                warn!("FileConfigStore: read {} failed: {}", self.path.display(), e);
                return Err(ConfigError::IoError);
            }
        };
        let cfg: SystemConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("FileConfigStore: {} is not valid config: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        info!("FileConfigStore: loaded config from {}", self.path.display());
        Ok(cfg)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;

        let json = serde_json::to_string_pretty(config).map_err(|_| ConfigError::IoError)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|_| ConfigError::IoError)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|_| ConfigError::IoError)?;
        tmp.write_all(json.as_bytes())
            .map_err(|_| ConfigError::IoError)?;
        tmp.persist(&self.path).map_err(|_| ConfigError::IoError)?;

        info!("FileConfigStore: config saved to {}", self.path.display());
        Ok(())
    }
}
