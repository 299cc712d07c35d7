// ABOUTME: Error surface of the lifecycle orchestrator.
// ABOUTME: One typed outcome per operation; store errors pass through.

use thiserror::Error;

use crate::configs::ConfigError;
use crate::init_system::InitError;
use crate::registry::RegistryError;
use crate::runtime::RuntimeError;
use crate::types::{IllegalConfigName, IllegalServiceName, ParseImageRefError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("service name '{0}' is illegal.")]
    IllegalServiceName(String),

    #[error("configuration name '{0}' is illegal.")]
    IllegalConfigName(String),

    #[error("docker daemon not available.")]
    DockerNotConnected,

    #[error("service '{0}' is running.")]
    ServiceIsRunning(String),

    #[error("service '{0}' is not running.")]
    ServiceIsNotRunning(String),

    #[error("no docker image assigned for '{0}'.")]
    NoImageAssigned(String),

    #[error("'latest' tag is disabled and can not be used for a deploy.")]
    LatestTagDisabled,

    #[error(transparent)]
    InvalidImageRef(#[from] ParseImageRefError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Init(#[from] InitError),
}

impl From<IllegalServiceName> for LifecycleError {
    fn from(err: IllegalServiceName) -> Self {
        LifecycleError::IllegalServiceName(err.0)
    }
}

impl From<IllegalConfigName> for LifecycleError {
    fn from(err: IllegalConfigName) -> Self {
        LifecycleError::IllegalConfigName(err.0)
    }
}
