// ABOUTME: Application-wide error type for dockhand.
// ABOUTME: Uses thiserror for ergonomic error handling.

use thiserror::Error;

use crate::configs::ConfigError;
use crate::lifecycle::LifecycleError;
use crate::registry::RegistryError;
use crate::runtime::RuntimeError;
use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
