// ABOUTME: Per-service configuration version store.
// ABOUTME: Named snapshot directories plus a `_CURRENT` symlink pointer.

mod environment;
mod error;

pub use environment::parse_environment;
pub use error::ConfigError;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use crate::types::{ConfigName, ServiceName};

/// Reserved pointer entry resolving to the active snapshot directory.
pub const CURRENT_POINTER: &str = "_CURRENT";

/// Snapshot seeded and selected when a service is created.
pub const INITIAL_CONFIG_NAME: &str = "initial";

/// Fixed-name environment file read from the active snapshot.
pub const ENVIRONMENT_FILE_NAME: &str = ".startup-env.conf";

/// One named configuration snapshot of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSnapshot {
    pub name: String,
    pub modified_at: DateTime<Utc>,
    pub current: bool,
}

/// Directory-per-snapshot store under `<config_root>/<service>/`.
///
/// The store never touches the registry; the lifecycle orchestrator is its
/// only mutator. The pointer swap is unlink-then-symlink, two steps: a crash
/// in between leaves no pointer, which reads as `NoSuchConfig` rather than
/// corrupt state.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_root: PathBuf,
}

impl ConfigStore {
    pub fn new(config_root: &Path) -> Self {
        Self {
            config_root: config_root.to_path_buf(),
        }
    }

    fn service_dir(&self, service: &ServiceName) -> PathBuf {
        self.config_root.join(service.as_str())
    }

    fn pointer_path(&self, service: &ServiceName) -> PathBuf {
        self.service_dir(service).join(CURRENT_POINTER)
    }

    /// Create a new, empty snapshot directory.
    pub fn create(
        &self,
        service: &ServiceName,
        config: &ConfigName,
    ) -> Result<PathBuf, ConfigError> {
        let dir = self.service_dir(service).join(config.as_str());

        if dir.exists() || fs::create_dir_all(&dir).is_err() {
            return Err(ConfigError::CannotCreateConfig {
                config: config.to_string(),
                service: service.to_string(),
            });
        }

        Ok(dir)
    }

    /// Remove a snapshot. The active snapshot and the pointer alias are
    /// protected.
    pub fn remove(&self, service: &ServiceName, config: &ConfigName) -> Result<(), ConfigError> {
        let current = self.current(service)?;

        if config.as_str() == current || config.as_str() == CURRENT_POINTER {
            return Err(ConfigError::CannotRemoveActiveConfig(current));
        }

        let dir = self.service_dir(service).join(config.as_str());
        if !dir.exists() || fs::remove_dir_all(&dir).is_err() {
            return Err(ConfigError::CannotRemoveConfig {
                config: config.to_string(),
                service: service.to_string(),
            });
        }

        Ok(())
    }

    /// Repoint `_CURRENT` at an existing snapshot: unlink the old pointer,
    /// then create the new one.
    pub fn select(&self, service: &ServiceName, config: &ConfigName) -> Result<(), ConfigError> {
        let dir = self.service_dir(service).join(config.as_str());
        if !dir.exists() {
            return Err(ConfigError::NoSuchConfig {
                config: config.to_string(),
                service: service.to_string(),
            });
        }

        let pointer = self.pointer_path(service);
        if pointer.symlink_metadata().is_ok() {
            fs::remove_file(&pointer)?;
        }
        symlink(config.as_str(), &pointer)?;

        Ok(())
    }

    /// Resolve the active snapshot name. An absent or dangling pointer is
    /// `NoSuchConfig`, not a distinct corruption state.
    pub fn current(&self, service: &ServiceName) -> Result<String, ConfigError> {
        let pointer = self.pointer_path(service);

        if !pointer.exists() {
            return Err(self.no_current_config(service));
        }

        let target = fs::read_link(&pointer).map_err(|_| self.no_current_config(service))?;
        Ok(target.to_string_lossy().into_owned())
    }

    fn no_current_config(&self, service: &ServiceName) -> ConfigError {
        ConfigError::NoSuchConfig {
            config: "<current config>".to_string(),
            service: service.to_string(),
        }
    }

    /// Absolute path of the active snapshot directory.
    pub fn current_dir(&self, service: &ServiceName) -> Result<PathBuf, ConfigError> {
        let current = self.current(service)?;
        Ok(self.service_dir(service).join(current))
    }

    /// Enumerate snapshots, ascending by modification time, with exactly one
    /// entry marked current. Entries whose first character is not
    /// alphanumeric (the pointer, hidden files) are filtered out.
    pub fn list(&self, service: &ServiceName) -> Result<Vec<ConfigSnapshot>, ConfigError> {
        let dir = self.service_dir(service);
        let current = self.current(service)?;

        let mut snapshots = Vec::new();
        let mut found_current = false;

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.chars().next().is_some_and(char::is_alphanumeric) {
                continue;
            }

            let modified: DateTime<Utc> = entry.metadata()?.modified()?.into();
            let is_current = name == current;
            found_current |= is_current;

            snapshots.push(ConfigSnapshot {
                name,
                modified_at: modified,
                current: is_current,
            });
        }

        if !found_current {
            return Err(self.no_current_config(service));
        }

        snapshots.sort_by(|a, b| {
            a.modified_at
                .cmp(&b.modified_at)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(snapshots)
    }

    /// Read the environment file from the active snapshot. A missing file is
    /// an empty environment, not an error.
    pub fn load_environment(
        &self,
        service: &ServiceName,
    ) -> Result<HashMap<String, String>, ConfigError> {
        let file = self.current_dir(service)?.join(ENVIRONMENT_FILE_NAME);

        if !file.exists() {
            return Ok(HashMap::new());
        }

        let contents = fs::read_to_string(&file)?;
        Ok(parse_environment(contents.lines()))
    }
}
