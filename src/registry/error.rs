// ABOUTME: Error types for the deploy registry.
// ABOUTME: Covers schema version, lookup, lock, and persistence failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("deploy file version is {found}, only version {expected} is supported.")]
    BadVersion { found: u32, expected: u32 },

    #[error("no such deploy: '{0}'.")]
    NoSuchDeploy(String),

    #[error("deploy '{0}' already exists.")]
    DeployExists(String),

    #[error("another exclusive operation is in progress.")]
    AnotherOperationInProgress,

    #[error("could not acquire deployment lock.")]
    LockUnavailable,

    #[error("deploy file is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
