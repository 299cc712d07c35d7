// ABOUTME: Lifecycle orchestrator gluing registry, config store, and the
// ABOUTME: runtime, init-system, and notification capabilities together.

mod error;
mod view;

pub use error::LifecycleError;
pub use view::{ConfigCreated, ConfigList, ServiceList, ServiceListEntry, ServiceView};

use std::sync::Arc;

use crate::configs::{ConfigStore, INITIAL_CONFIG_NAME};
use crate::init_system::InitSystem;
use crate::layout::Layout;
use crate::notify::{CallbackPayload, Notifier};
use crate::registry::{DeployRegistry, DeploymentRecord, RegistryError};
use crate::runtime::{BindMount, ContainerRuntime, ContainerStatus};
use crate::types::{ConfigName, ImageRef, ServiceName};

/// Mount point of the active configuration inside the container.
const CONFIG_MOUNT_TARGET: &str = "/data/config";

/// Mount point of the writable log directory inside the container.
const LOG_MOUNT_TARGET: &str = "/data/log";

#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    /// Treat an already running service as success instead of an error.
    pub ignore_running: bool,
    /// Block until the container exits, for init-system supervision.
    pub block: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StopOptions {
    /// Treat an already stopped service as success instead of an error.
    pub ignore_stopped: bool,
}

/// The service manager. Every public operation validates its name arguments
/// before touching any state, so an illegal name never has a side effect.
pub struct ServiceManager {
    registry: DeployRegistry,
    store: ConfigStore,
    layout: Layout,
    runtime: Arc<dyn ContainerRuntime>,
    init: Arc<dyn InitSystem>,
    notifier: Arc<dyn Notifier>,
    disable_latest_tag: bool,
}

impl ServiceManager {
    pub fn new(
        registry: DeployRegistry,
        store: ConfigStore,
        layout: Layout,
        runtime: Arc<dyn ContainerRuntime>,
        init: Arc<dyn InitSystem>,
        notifier: Arc<dyn Notifier>,
        disable_latest_tag: bool,
    ) -> Self {
        Self {
            registry,
            store,
            layout,
            runtime,
            init,
            notifier,
            disable_latest_tag,
        }
    }

    /// Register a service: filesystem skeleton, seeded `initial` config, and
    /// a fresh registry record with no image.
    pub async fn create(&self, name: &str) -> Result<ServiceView, LifecycleError> {
        let name = ServiceName::new(name)?;

        if self.registry.exists(&name)? {
            return Err(RegistryError::DeployExists(name.to_string()).into());
        }

        self.layout.create_service_dirs(&name)?;

        let initial = ConfigName::new(INITIAL_CONFIG_NAME)?;
        self.store.create(&name, &initial)?;
        self.store.select(&name, &initial)?;

        let record = self.registry.add(&name)?;
        tracing::info!(service = %name, "created service");

        self.view(&name, &record).await
    }

    /// Unregister a service and delete everything belonging to it. The
    /// service must not be running.
    pub async fn remove(&self, name: &str) -> Result<(), LifecycleError> {
        let name = ServiceName::new(name)?;
        self.ensure_exists(&name)?;
        self.ensure_connected().await?;

        if self.runtime.is_running(&name).await? {
            return Err(LifecycleError::ServiceIsRunning(name.to_string()));
        }

        self.init.disable(&name).await?;
        self.runtime.destroy_container(&name).await?;
        self.registry.remove(&name)?;
        self.layout.remove_service_dirs(&name)?;

        tracing::info!(service = %name, "removed service");
        Ok(())
    }

    /// Assign an image to a service, pulling it first. Returns the daemon's
    /// pull progress messages.
    pub async fn deploy(
        &self,
        name: &str,
        image: &ImageRef,
        callback_uri: Option<&str>,
    ) -> Result<Vec<String>, LifecycleError> {
        let name = ServiceName::new(name)?;
        self.ensure_exists(&name)?;
        self.ensure_connected().await?;

        if self.disable_latest_tag && image.is_latest() {
            return Err(LifecycleError::LatestTagDisabled);
        }

        // Pull before recording anything, so a missing image leaves the
        // previous deployment intact.
        let messages = self.runtime.pull(image).await?;
        self.registry
            .save_deployment(&name, &image.to_string(), callback_uri)?;

        let record = self.registry.info(&name)?;
        if record.enabled {
            self.init.enable(&name).await?;
        }

        tracing::info!(service = %name, image = %image, "deployed image");
        Ok(messages)
    }

    pub async fn start(&self, name: &str, options: StartOptions) -> Result<(), LifecycleError> {
        let name = ServiceName::new(name)?;
        self.ensure_exists(&name)?;
        self.ensure_connected().await?;

        if self.runtime.is_running(&name).await? {
            if !options.ignore_running {
                return Err(LifecycleError::ServiceIsRunning(name.to_string()));
            }
        } else {
            self.do_start(&name).await?;
        }

        if options.block {
            self.runtime.wait_for_exit(&name).await?;
        }

        Ok(())
    }

    pub async fn stop(&self, name: &str, options: StopOptions) -> Result<(), LifecycleError> {
        let name = ServiceName::new(name)?;
        self.ensure_exists(&name)?;
        self.ensure_connected().await?;

        if !self.runtime.is_running(&name).await? {
            if !options.ignore_stopped {
                return Err(LifecycleError::ServiceIsNotRunning(name.to_string()));
            }
            return Ok(());
        }

        self.do_stop(&name).await?;
        Ok(())
    }

    /// Stop and start a running service, recreating its container so config
    /// and deployment changes take effect.
    pub async fn restart(&self, name: &str) -> Result<(), LifecycleError> {
        let name = ServiceName::new(name)?;
        self.ensure_exists(&name)?;
        self.ensure_connected().await?;

        if !self.runtime.is_running(&name).await? {
            return Err(LifecycleError::ServiceIsNotRunning(name.to_string()));
        }

        if self.do_stop(&name).await? {
            self.do_start(&name).await?;
        }

        Ok(())
    }

    /// Mark a service for boot-time auto-start. Init-system installation is
    /// deferred until an image is assigned; `deploy` catches up on it.
    pub async fn enable(&self, name: &str) -> Result<(), LifecycleError> {
        let name = ServiceName::new(name)?;
        let record = self.registry.info(&name)?;

        self.registry.set_enabled(&name, true)?;
        if record.has_image() {
            self.init.enable(&name).await?;
        }

        Ok(())
    }

    pub async fn disable(&self, name: &str) -> Result<(), LifecycleError> {
        let name = ServiceName::new(name)?;
        self.registry.info(&name)?;

        self.registry.set_enabled(&name, false)?;
        self.init.disable(&name).await?;

        Ok(())
    }

    pub async fn status(&self, name: &str) -> Result<ServiceView, LifecycleError> {
        let name = ServiceName::new(name)?;
        let record = self.registry.info(&name)?;
        self.ensure_connected().await?;

        self.view(&name, &record).await
    }

    pub async fn list(&self) -> Result<ServiceList, LifecycleError> {
        self.ensure_connected().await?;

        let file = self.registry.load()?;
        let mut deploys = std::collections::BTreeMap::new();

        for (raw_name, record) in &file.deploys {
            let name = ServiceName::new(raw_name)?;
            let container = self.runtime.status(&name).await?;
            let config = self.store.current(&name).ok();
            deploys.insert(
                raw_name.clone(),
                ServiceListEntry::new(record, config, container),
            );
        }

        Ok(ServiceList { deploys })
    }

    pub fn config_create(&self, service: &str, config: &str) -> Result<ConfigCreated, LifecycleError> {
        let (service, config) = self.config_args(service, config)?;
        let path = self.store.create(&service, &config)?;
        Ok(ConfigCreated { path })
    }

    pub fn config_remove(&self, service: &str, config: &str) -> Result<(), LifecycleError> {
        let (service, config) = self.config_args(service, config)?;
        self.store.remove(&service, &config)?;
        Ok(())
    }

    /// Repoint the active configuration. Takes effect on the next start or
    /// restart; a running container keeps its old mounts.
    pub fn config_activate(&self, service: &str, config: &str) -> Result<(), LifecycleError> {
        let (service, config) = self.config_args(service, config)?;
        self.store.select(&service, &config)?;
        Ok(())
    }

    pub fn config_list(&self, service: &str) -> Result<ConfigList, LifecycleError> {
        let service = ServiceName::new(service)?;
        self.ensure_exists(&service)?;
        let configs = self.store.list(&service)?;
        Ok(ConfigList { configs })
    }

    fn config_args(
        &self,
        service: &str,
        config: &str,
    ) -> Result<(ServiceName, ConfigName), LifecycleError> {
        let service = ServiceName::new(service)?;
        let config = ConfigName::new(config)?;
        self.ensure_exists(&service)?;
        Ok((service, config))
    }

    fn ensure_exists(&self, name: &ServiceName) -> Result<(), LifecycleError> {
        if !self.registry.exists(name)? {
            return Err(RegistryError::NoSuchDeploy(name.to_string()).into());
        }
        Ok(())
    }

    async fn ensure_connected(&self) -> Result<(), LifecycleError> {
        if !self.runtime.connected().await {
            return Err(LifecycleError::DockerNotConnected);
        }
        Ok(())
    }

    /// Recreate and start the container from the current registry record and
    /// active configuration, then flip the persisted running flag.
    async fn do_start(&self, name: &ServiceName) -> Result<(), LifecycleError> {
        let record = self.registry.info(name)?;
        if !record.has_image() {
            return Err(LifecycleError::NoImageAssigned(name.to_string()));
        }

        let image = ImageRef::parse(&record.deployment)?;
        let env = self.store.load_environment(name)?;
        let mounts = self.service_mounts(name)?;

        self.runtime.destroy_container(name).await?;
        self.runtime
            .create_container(name, &image, &env, &mounts)
            .await?;
        self.runtime.start(name).await?;

        if let Some(uri) = &record.callback_uri {
            self.notifier.running(uri, &self.payload(name, &record)).await;
        }

        self.registry.set_running(name, true)?;
        tracing::info!(service = %name, image = %image, "started service");
        Ok(())
    }

    /// Stop the container and flip the persisted running flag regardless of
    /// whether a live container was found. Returns whether one was.
    async fn do_stop(&self, name: &ServiceName) -> Result<bool, LifecycleError> {
        let record = self.registry.info(name)?;
        let stopped = self.runtime.stop(name).await?;

        if let Some(uri) = &record.callback_uri {
            self.notifier.stopped(uri, &self.payload(name, &record)).await;
        }

        self.registry.set_running(name, false)?;
        tracing::info!(service = %name, "stopped service");
        Ok(stopped)
    }

    fn payload(&self, name: &ServiceName, record: &DeploymentRecord) -> CallbackPayload {
        CallbackPayload {
            name: name.to_string(),
            deployment: record.deployment.clone(),
            config: self.store.current(name).unwrap_or_default(),
        }
    }

    fn service_mounts(&self, name: &ServiceName) -> Result<Vec<BindMount>, LifecycleError> {
        let paths = self.layout.service_paths(name);
        let config_dir = self.store.current_dir(name)?;

        Ok(vec![
            BindMount {
                source: config_dir,
                target: CONFIG_MOUNT_TARGET.to_string(),
                read_only: true,
            },
            BindMount {
                source: paths.log,
                target: LOG_MOUNT_TARGET.to_string(),
                read_only: false,
            },
        ])
    }

    async fn view(
        &self,
        name: &ServiceName,
        record: &DeploymentRecord,
    ) -> Result<ServiceView, LifecycleError> {
        let paths = self.layout.service_paths(name);
        let config = self.store.current(name)?;
        let config_location = self.store.current_dir(name)?;
        let container = self.container_status(name).await;

        Ok(ServiceView {
            name: name.to_string(),
            running: record.running,
            enabled: record.enabled,
            deployment: record.deployment.clone(),
            callback_uri: record.callback_uri.clone(),
            config,
            config_location,
            log_location: paths.log,
            script_location: paths.script,
            container,
        })
    }

    /// Best-effort container lookup for views; an unreachable daemon reads
    /// as no container rather than a failure.
    async fn container_status(&self, name: &ServiceName) -> Option<ContainerStatus> {
        match self.runtime.status(name).await {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(service = %name, "container status unavailable: {e}");
                None
            }
        }
    }
}
