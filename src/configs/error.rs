// ABOUTME: Error types for the config version store and filesystem layout.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot create configuration '{config}' for deploy '{service}'.")]
    CannotCreateConfig { config: String, service: String },

    #[error("cannot remove configuration '{config}' for deploy '{service}'.")]
    CannotRemoveConfig { config: String, service: String },

    #[error("cannot remove active config '{0}'")]
    CannotRemoveActiveConfig(String),

    #[error("no such configuration: '{config}' for service '{service}'.")]
    NoSuchConfig { config: String, service: String },

    #[error("cannot create deploy '{0}'.")]
    CannotCreateDeploy(String),

    #[error("cannot remove deploy '{0}'.")]
    CannotRemoveDeploy(String),

    #[error("cannot access folder '{0}'.")]
    FolderNotAccessible(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
