// ABOUTME: Container runtime capability consumed by the lifecycle orchestrator.
// ABOUTME: Trait definition, status/mount types, and the bollard-backed impl.

mod docker;

pub use docker::DockerRuntime;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::{ImageRef, ServiceName};

/// Errors from the container runtime capability.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("docker daemon not available.")]
    NotConnected,

    #[error("docker image '{image}' not available ({detail}).")]
    ImageNotAvailable { image: String, detail: String },

    #[error("container runtime error: {0}")]
    Api(String),
}

/// Sanitized view of a service's container, for status output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerStatus {
    pub running: bool,
    pub id: String,
    pub image: String,
    pub created: Option<String>,
    pub started: Option<String>,
    /// Set only when the container is not running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<String>,
    pub environment: Vec<String>,
}

/// A host path bind-mounted into the service container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

/// Container runtime operations needed by the orchestrator. One container
/// per service, addressed by the service name.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// True when the daemon answers a ping.
    async fn connected(&self) -> bool;

    /// Status of the service's container, `None` when no container exists.
    async fn status(&self, name: &ServiceName) -> Result<Option<ContainerStatus>, RuntimeError>;

    /// True when the service's container exists and is running.
    async fn is_running(&self, name: &ServiceName) -> Result<bool, RuntimeError>;

    /// Pull an image, returning the progress messages the daemon reported.
    async fn pull(&self, image: &ImageRef) -> Result<Vec<String>, RuntimeError>;

    /// Create a container for the service. Any existing container must be
    /// destroyed first; creation does not start it.
    async fn create_container(
        &self,
        name: &ServiceName,
        image: &ImageRef,
        env: &HashMap<String, String>,
        mounts: &[BindMount],
    ) -> Result<(), RuntimeError>;

    /// Remove the service's container. No-op when absent.
    async fn destroy_container(&self, name: &ServiceName) -> Result<(), RuntimeError>;

    /// Start a created container.
    async fn start(&self, name: &ServiceName) -> Result<(), RuntimeError>;

    /// Stop the container if present. Returns whether a live container was
    /// actually stopped.
    async fn stop(&self, name: &ServiceName) -> Result<bool, RuntimeError>;

    /// Block until the service's container terminates. No timeout; the
    /// caller's process must be killed externally to abandon the wait.
    async fn wait_for_exit(&self, name: &ServiceName) -> Result<(), RuntimeError>;
}
