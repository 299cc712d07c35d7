// ABOUTME: Host-wide advisory lock guarding the deploy registry.
// ABOUTME: fs2 flock on a dedicated lock file, shared or exclusive, no timeout.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use super::RegistryError;

pub const LOCK_FILE_NAME: &str = ".lock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Concurrent readers; blocks behind a held or pending exclusive lock.
    Shared,
    /// Single writer for a full load-mutate-persist cycle.
    Exclusive,
}

/// One lock handle per critical section. The handle is strictly
/// non-reentrant: acquiring while held is an error, not a nested lock.
/// Acquisition blocks without timeout until the holder releases.
#[derive(Debug)]
pub struct RegistryLock {
    path: PathBuf,
    handle: Option<File>,
}

impl RegistryLock {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(LOCK_FILE_NAME),
            handle: None,
        }
    }

    pub fn acquire(&mut self, mode: LockMode) -> Result<(), RegistryError> {
        if self.handle.is_some() {
            return Err(RegistryError::AnotherOperationInProgress);
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        match mode {
            LockMode::Shared => file.lock_shared()?,
            LockMode::Exclusive => file.lock_exclusive()?,
        }

        self.handle = Some(file);
        Ok(())
    }

    pub fn release(&mut self) -> Result<(), RegistryError> {
        match self.handle.take() {
            Some(file) => {
                FileExt::unlock(&file)?;
                Ok(())
            }
            None => Err(RegistryError::LockUnavailable),
        }
    }
}
