// ABOUTME: On-disk layout for the managed data tree.
// ABOUTME: Creates and removes per-service config, log, and script directories.

use std::fs;
use std::path::{Path, PathBuf};

use crate::configs::ConfigError;
use crate::settings::LayoutSettings;
use crate::types::ServiceName;

/// Paths making up a service's filesystem skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePaths {
    pub config_base: PathBuf,
    pub log: PathBuf,
    pub script: PathBuf,
}

/// The managed data tree: `<root>/config`, `<root>/log`, `<root>/script`.
/// The registry file and its lock also live directly under the root.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    config_dir: PathBuf,
    log_dir: PathBuf,
    script_dir: PathBuf,
}

impl Layout {
    /// Open the data tree, creating the top-level directories as needed.
    pub fn open(settings: &LayoutSettings) -> Result<Self, ConfigError> {
        let root = ensure_dir(&settings.root)?;
        let config_dir = ensure_dir(&root.join(&settings.config_dir))?;
        let log_dir = ensure_dir(&root.join(&settings.log_dir))?;
        let script_dir = ensure_dir(&root.join(&settings.script_dir))?;

        Ok(Self {
            root,
            config_dir,
            log_dir,
            script_dir,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Create the per-service skeleton. Partial failures are collapsed into
    /// one `CannotCreateDeploy`; already-created directories stay behind.
    pub fn create_service_dirs(&self, service: &ServiceName) -> Result<ServicePaths, ConfigError> {
        let paths = self.service_paths(service);

        for dir in [&paths.config_base, &paths.log, &paths.script] {
            if ensure_dir(dir).is_err() {
                return Err(ConfigError::CannotCreateDeploy(service.to_string()));
            }
        }

        Ok(paths)
    }

    /// Remove everything on the filesystem belonging to a service.
    pub fn remove_service_dirs(&self, service: &ServiceName) -> Result<(), ConfigError> {
        let paths = self.service_paths(service);
        let mut failed = false;

        for dir in [&paths.config_base, &paths.log, &paths.script] {
            if dir.exists() && fs::remove_dir_all(dir).is_err() {
                failed = true;
            }
        }

        if failed {
            return Err(ConfigError::CannotRemoveDeploy(service.to_string()));
        }
        Ok(())
    }

    pub fn service_paths(&self, service: &ServiceName) -> ServicePaths {
        ServicePaths {
            config_base: self.config_dir.join(service.as_str()),
            log: self.log_dir.join(service.as_str()),
            script: self.script_dir.join(service.as_str()),
        }
    }

    /// Names of script files present for a service, hidden entries filtered.
    pub fn load_scripts(&self, service: &ServiceName) -> Result<Vec<String>, ConfigError> {
        let dir = self.script_dir.join(service.as_str());
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.chars().next().is_some_and(char::is_alphanumeric) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn script_path(&self, service: &ServiceName, script: &str) -> PathBuf {
        self.script_dir.join(service.as_str()).join(script)
    }
}

fn ensure_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }

    let metadata = fs::metadata(path)?;
    if !metadata.is_dir() {
        return Err(ConfigError::FolderNotAccessible(path.to_path_buf()));
    }

    Ok(path.to_path_buf())
}
