// ABOUTME: Bollard-backed implementation of the container runtime capability.
// ABOUTME: Talks to the docker daemon over the configured Unix socket.

use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{ContainerCreateBody, ContainerInspectResponse, HostConfig};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions, WaitContainerOptions,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::path::Path;

use super::{BindMount, ContainerRuntime, ContainerStatus, RuntimeError};
use crate::types::{ImageRef, ServiceName};

fn map_api_error(e: bollard::errors::Error) -> RuntimeError {
    RuntimeError::Api(e.to_string())
}

fn is_not_found(e: &bollard::errors::Error) -> bool {
    matches!(
        e,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

/// Docker daemon client. Construction is best-effort: a socket that cannot
/// even be addressed reads as a disconnected daemon, and `connected()`
/// reports actual reachability. Registry-only commands must keep working on
/// hosts without docker.
pub struct DockerRuntime {
    client: Option<Docker>,
}

impl DockerRuntime {
    pub fn new(client: Docker) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Build a client for the daemon's Unix socket.
    pub fn connect(socket: &Path) -> Self {
        let client = Docker::connect_with_unix(
            &socket.to_string_lossy(),
            120,
            bollard::API_DEFAULT_VERSION,
        );
        if let Err(e) = &client {
            tracing::debug!(socket = %socket.display(), "docker client unavailable: {e}");
        }
        Self {
            client: client.ok(),
        }
    }

    fn client(&self) -> Result<&Docker, RuntimeError> {
        self.client.as_ref().ok_or(RuntimeError::NotConnected)
    }

    /// Inspect the service's container, mapping 404 to `None`.
    async fn inspect(
        &self,
        name: &ServiceName,
    ) -> Result<Option<ContainerInspectResponse>, RuntimeError> {
        match self
            .client()?
            .inspect_container(name.as_str(), None::<InspectContainerOptions>)
            .await
        {
            Ok(details) => Ok(Some(details)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(map_api_error(e)),
        }
    }
}

fn status_from_inspect(details: &ContainerInspectResponse) -> ContainerStatus {
    let state = details.state.as_ref();
    let config = details.config.as_ref();
    let running = state.and_then(|s| s.running).unwrap_or(false);

    ContainerStatus {
        running,
        id: details.id.clone().unwrap_or_default(),
        image: config.and_then(|c| c.image.clone()).unwrap_or_default(),
        created: details.created.map(|t| t.to_string()),
        started: state.and_then(|s| s.started_at.clone()),
        finished: if running {
            None
        } else {
            state.and_then(|s| s.finished_at.clone())
        },
        environment: config.and_then(|c| c.env.clone()).unwrap_or_default(),
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn connected(&self) -> bool {
        match &self.client {
            Some(client) => client.ping().await.is_ok(),
            None => false,
        }
    }

    async fn status(&self, name: &ServiceName) -> Result<Option<ContainerStatus>, RuntimeError> {
        Ok(self.inspect(name).await?.as_ref().map(status_from_inspect))
    }

    async fn is_running(&self, name: &ServiceName) -> Result<bool, RuntimeError> {
        Ok(self
            .inspect(name)
            .await?
            .and_then(|details| details.state.and_then(|s| s.running))
            .unwrap_or(false))
    }

    async fn pull(&self, image: &ImageRef) -> Result<Vec<String>, RuntimeError> {
        let opts = CreateImageOptions {
            from_image: Some(image.repository().to_string()),
            tag: Some(image.effective_tag().to_string()),
            ..Default::default()
        };

        let mut messages = Vec::new();
        let mut stream = self.client()?.create_image(Some(opts), None, None);
        while let Some(progress) = stream.next().await {
            match progress {
                Ok(info) => {
                    if let Some(status) = info.status {
                        tracing::debug!(image = %image, "{status}");
                        messages.push(status);
                    }
                }
                Err(e) => {
                    return Err(RuntimeError::ImageNotAvailable {
                        image: image.to_string(),
                        detail: e.to_string(),
                    });
                }
            }
        }

        Ok(messages)
    }

    async fn create_container(
        &self,
        name: &ServiceName,
        image: &ImageRef,
        env: &HashMap<String, String>,
        mounts: &[BindMount],
    ) -> Result<(), RuntimeError> {
        let env: Vec<String> = env.iter().map(|(k, v)| format!("{k}={v}")).collect();

        let binds: Vec<String> = mounts
            .iter()
            .map(|m| {
                let source = m.source.to_string_lossy();
                if m.read_only {
                    format!("{}:{}:ro", source, m.target)
                } else {
                    format!("{}:{}", source, m.target)
                }
            })
            .collect();

        let host_config = HostConfig {
            binds: if binds.is_empty() { None } else { Some(binds) },
            network_mode: Some("host".to_string()),
            ..Default::default()
        };

        let body = ContainerCreateBody {
            image: Some(image.to_string()),
            env: if env.is_empty() { None } else { Some(env) },
            host_config: Some(host_config),
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: Some(name.to_string()),
            ..Default::default()
        };

        self.client()?
            .create_container(Some(opts), body)
            .await
            .map_err(map_api_error)?;

        Ok(())
    }

    async fn destroy_container(&self, name: &ServiceName) -> Result<(), RuntimeError> {
        if self.inspect(name).await?.is_none() {
            return Ok(());
        }

        self.client()?
            .remove_container(
                name.as_str(),
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(map_api_error)
    }

    async fn start(&self, name: &ServiceName) -> Result<(), RuntimeError> {
        self.client()?
            .start_container(name.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(map_api_error)
    }

    async fn stop(&self, name: &ServiceName) -> Result<bool, RuntimeError> {
        let Some(details) = self.inspect(name).await? else {
            return Ok(false);
        };

        let was_running = details
            .state
            .as_ref()
            .and_then(|s| s.running)
            .unwrap_or(false);

        self.client()?
            .stop_container(name.as_str(), None::<StopContainerOptions>)
            .await
            .map_err(map_api_error)?;

        Ok(was_running)
    }

    async fn wait_for_exit(&self, name: &ServiceName) -> Result<(), RuntimeError> {
        if self.inspect(name).await?.is_none() {
            return Ok(());
        }

        let mut stream = self
            .client()?
            .wait_container(name.as_str(), None::<WaitContainerOptions>);

        while let Some(result) = stream.next().await {
            match result {
                Ok(_) => {}
                // The wait endpoint reports a nonzero exit status as a
                // stream error; termination is all the caller asked about.
                Err(bollard::errors::Error::DockerContainerWaitError { .. }) => {}
                Err(e) => return Err(map_api_error(e)),
            }
        }

        Ok(())
    }
}
