// ABOUTME: Persistent registry of per-service deployment records.
// ABOUTME: Lock-guarded JSON file with atomic two-rename persistence.

mod error;
mod lock;

pub use error::RegistryError;
pub use lock::{LockMode, RegistryLock};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::ServiceName;

pub const REGISTRY_VERSION: u32 = 1;
pub const REGISTRY_FILE_NAME: &str = "deploy.json";

/// Sentinel for a record with no image assigned.
pub const NO_IMAGE: &str = "-";

/// Per-service deployment state as persisted in the registry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub name: String,
    pub running: bool,
    pub enabled: bool,
    pub deployment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_uri: Option<String>,
}

impl DeploymentRecord {
    fn new(name: &ServiceName) -> Self {
        Self {
            name: name.to_string(),
            running: false,
            enabled: false,
            deployment: NO_IMAGE.to_string(),
            callback_uri: None,
        }
    }

    pub fn has_image(&self) -> bool {
        self.deployment != NO_IMAGE
    }
}

/// On-disk shape of the registry file. `count` is a monotonic write counter:
/// it increments on every successful mutation and is surfaced as-is, never
/// validated against the number of records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFile {
    pub version: u32,
    pub count: u64,
    pub deploys: BTreeMap<String, DeploymentRecord>,
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION,
            count: 0,
            deploys: BTreeMap::new(),
        }
    }
}

/// The deploy registry: a single JSON file plus a host-wide advisory lock.
///
/// Every mutation holds the exclusive lock for the whole
/// load-mutate-persist cycle; reads hold the shared lock. Persistence is a
/// two-rename swap through `deploy.json.new` and `deploy.json.old`; a crash
/// between the renames is repaired on the next load by promoting the backup.
#[derive(Debug, Clone)]
pub struct DeployRegistry {
    root: PathBuf,
    file_path: PathBuf,
}

impl DeployRegistry {
    /// Open the registry under `root`, creating an empty registry file on
    /// first use. Recovers a backup left behind by a crashed save.
    pub fn open(root: &Path) -> Result<Self, RegistryError> {
        fs::create_dir_all(root)?;

        let registry = Self {
            root: root.to_path_buf(),
            file_path: root.join(REGISTRY_FILE_NAME),
        };

        let mut lock = RegistryLock::new(&registry.root);
        lock.acquire(LockMode::Exclusive)?;
        let result = registry.ensure_file();
        let released = lock.release();
        result?;
        released?;

        Ok(registry)
    }

    fn ensure_file(&self) -> Result<(), RegistryError> {
        self.recover_if_needed()?;
        if !self.file_path.exists() {
            let initial = serde_json::to_string_pretty(&RegistryFile::default())?;
            fs::write(&self.file_path, initial)?;
        }
        Ok(())
    }

    fn backup_path(&self) -> PathBuf {
        self.root.join(format!("{REGISTRY_FILE_NAME}.old"))
    }

    fn staging_path(&self) -> PathBuf {
        self.root.join(format!("{REGISTRY_FILE_NAME}.new"))
    }

    /// A crash between the two save renames leaves the registry at the
    /// backup name with no current file; promote the backup in that case.
    /// The rename is a write, so callers must hold the exclusive lock;
    /// shared-lock readers fall back to the backup in `load_file` instead.
    fn recover_if_needed(&self) -> Result<(), RegistryError> {
        let backup = self.backup_path();
        if !self.file_path.exists() && backup.exists() {
            tracing::warn!(
                registry = %self.file_path.display(),
                "registry file missing, promoting backup from interrupted save"
            );
            fs::rename(&backup, &self.file_path)?;
        }
        Ok(())
    }

    /// Caller must hold at least the shared lock. When an interrupted save
    /// left only the backup behind, read that; promotion back to the
    /// current name happens under the exclusive lock only.
    fn load_file(&self) -> Result<RegistryFile, RegistryError> {
        let backup = self.backup_path();
        let path = if !self.file_path.exists() && backup.exists() {
            backup
        } else {
            self.file_path.clone()
        };

        let contents = fs::read_to_string(&path)?;
        let file: RegistryFile = serde_json::from_str(&contents)?;

        if file.version != REGISTRY_VERSION {
            return Err(RegistryError::BadVersion {
                found: file.version,
                expected: REGISTRY_VERSION,
            });
        }

        Ok(file)
    }

    /// Caller must hold the exclusive lock.
    fn save_atomic(&self, file: &RegistryFile) -> Result<(), RegistryError> {
        let staging = self.staging_path();
        let backup = self.backup_path();

        fs::write(&staging, serde_json::to_string_pretty(file)?)?;

        if backup.exists() {
            fs::remove_file(&backup)?;
        }
        fs::rename(&self.file_path, &backup)?;
        fs::rename(&staging, &self.file_path)?;

        Ok(())
    }

    fn read<T>(
        &self,
        op: impl FnOnce(&RegistryFile) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let mut lock = RegistryLock::new(&self.root);
        lock.acquire(LockMode::Shared)?;
        let result = self.load_file().and_then(|file| op(&file));
        let released = lock.release();
        let value = result?;
        released?;
        Ok(value)
    }

    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut RegistryFile) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let mut lock = RegistryLock::new(&self.root);
        lock.acquire(LockMode::Exclusive)?;
        let result = (|| -> Result<T, RegistryError> {
            self.recover_if_needed()?;
            let mut file = self.load_file()?;
            let value = op(&mut file)?;
            file.count += 1;
            self.save_atomic(&file)?;
            Ok(value)
        })();
        let released = lock.release();
        let value = result?;
        released?;
        Ok(value)
    }

    /// Load the whole registry file under a shared lock.
    pub fn load(&self) -> Result<RegistryFile, RegistryError> {
        self.read(|file| Ok(file.clone()))
    }

    pub fn exists(&self, name: &ServiceName) -> Result<bool, RegistryError> {
        self.read(|file| Ok(file.deploys.contains_key(name.as_str())))
    }

    pub fn info(&self, name: &ServiceName) -> Result<DeploymentRecord, RegistryError> {
        self.read(|file| {
            file.deploys
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| RegistryError::NoSuchDeploy(name.to_string()))
        })
    }

    /// Insert a fresh record: not running, not enabled, no image.
    pub fn add(&self, name: &ServiceName) -> Result<DeploymentRecord, RegistryError> {
        self.mutate(|file| {
            if file.deploys.contains_key(name.as_str()) {
                return Err(RegistryError::DeployExists(name.to_string()));
            }
            let record = DeploymentRecord::new(name);
            file.deploys.insert(name.to_string(), record.clone());
            Ok(record)
        })
    }

    pub fn remove(&self, name: &ServiceName) -> Result<(), RegistryError> {
        self.mutate(|file| {
            file.deploys
                .remove(name.as_str())
                .map(|_| ())
                .ok_or_else(|| RegistryError::NoSuchDeploy(name.to_string()))
        })
    }

    pub fn set_running(&self, name: &ServiceName, running: bool) -> Result<(), RegistryError> {
        self.mutate(|file| {
            let record = file
                .deploys
                .get_mut(name.as_str())
                .ok_or_else(|| RegistryError::NoSuchDeploy(name.to_string()))?;
            record.running = running;
            Ok(())
        })
    }

    pub fn set_enabled(&self, name: &ServiceName, enabled: bool) -> Result<(), RegistryError> {
        self.mutate(|file| {
            let record = file
                .deploys
                .get_mut(name.as_str())
                .ok_or_else(|| RegistryError::NoSuchDeploy(name.to_string()))?;
            record.enabled = enabled;
            Ok(())
        })
    }

    /// Assign an image to a record. The callback URI is overwritten whole:
    /// a present value replaces any stored one, an absent value deletes it.
    pub fn save_deployment(
        &self,
        name: &ServiceName,
        deployment: &str,
        callback_uri: Option<&str>,
    ) -> Result<(), RegistryError> {
        self.mutate(|file| {
            let record = file
                .deploys
                .get_mut(name.as_str())
                .ok_or_else(|| RegistryError::NoSuchDeploy(name.to_string()))?;
            record.deployment = deployment.to_string();
            record.callback_uri = callback_uri.map(str::to_string);
            Ok(())
        })
    }
}
