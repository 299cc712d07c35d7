// ABOUTME: Test support utilities.
// ABOUTME: In-memory fakes for the runtime, init-system, and notifier traits.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use dockhand::configs::ConfigStore;
use dockhand::init_system::{InitError, InitSystem};
use dockhand::layout::Layout;
use dockhand::lifecycle::ServiceManager;
use dockhand::notify::{CallbackPayload, Notifier};
use dockhand::registry::DeployRegistry;
use dockhand::runtime::{BindMount, ContainerRuntime, ContainerStatus, RuntimeError};
use dockhand::settings::LayoutSettings;
use dockhand::types::{ImageRef, ServiceName};

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub running: bool,
    pub image: String,
    pub env: HashMap<String, String>,
    pub mounts: Vec<BindMount>,
}

#[derive(Default)]
struct RuntimeState {
    connected: bool,
    fail_pull: bool,
    containers: HashMap<String, FakeContainer>,
    pulled: Vec<String>,
    created: Vec<String>,
    destroyed: Vec<String>,
}

/// In-memory stand-in for the docker daemon.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<RuntimeState>,
}

#[allow(dead_code)]
impl FakeRuntime {
    pub fn connected() -> Self {
        let runtime = Self::default();
        runtime.state.lock().unwrap().connected = true;
        runtime
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn fail_pulls(&self) {
        self.state.lock().unwrap().fail_pull = true;
    }

    /// Plant a container as if a previous start left it behind.
    pub fn plant_container(&self, name: &str, image: &str, running: bool) {
        self.state.lock().unwrap().containers.insert(
            name.to_string(),
            FakeContainer {
                running,
                image: image.to_string(),
                env: HashMap::new(),
                mounts: Vec::new(),
            },
        );
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.state.lock().unwrap().containers.get(name).cloned()
    }

    pub fn pulled(&self) -> Vec<String> {
        self.state.lock().unwrap().pulled.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.state.lock().unwrap().destroyed.clone()
    }

    pub fn call_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.pulled.len() + state.created.len() + state.destroyed.len()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    async fn status(&self, name: &ServiceName) -> Result<Option<ContainerStatus>, RuntimeError> {
        let state = self.state.lock().unwrap();
        if !state.connected {
            return Err(RuntimeError::NotConnected);
        }
        Ok(state.containers.get(name.as_str()).map(|c| ContainerStatus {
            running: c.running,
            id: format!("fake-{name}"),
            image: c.image.clone(),
            environment: c.env.iter().map(|(k, v)| format!("{k}={v}")).collect(),
            ..ContainerStatus::default()
        }))
    }

    async fn is_running(&self, name: &ServiceName) -> Result<bool, RuntimeError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .get(name.as_str())
            .is_some_and(|c| c.running))
    }

    async fn pull(&self, image: &ImageRef) -> Result<Vec<String>, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_pull {
            return Err(RuntimeError::ImageNotAvailable {
                image: image.to_string(),
                detail: "manifest unknown".to_string(),
            });
        }
        state.pulled.push(image.to_string());
        Ok(vec![format!("Pulled {image}")])
    }

    async fn create_container(
        &self,
        name: &ServiceName,
        image: &ImageRef,
        env: &HashMap<String, String>,
        mounts: &[BindMount],
    ) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.created.push(name.to_string());
        state.containers.insert(
            name.to_string(),
            FakeContainer {
                running: false,
                image: image.to_string(),
                env: env.clone(),
                mounts: mounts.to_vec(),
            },
        );
        Ok(())
    }

    async fn destroy_container(&self, name: &ServiceName) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        if state.containers.remove(name.as_str()).is_some() {
            state.destroyed.push(name.to_string());
        }
        Ok(())
    }

    async fn start(&self, name: &ServiceName) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        match state.containers.get_mut(name.as_str()) {
            Some(container) => {
                container.running = true;
                Ok(())
            }
            None => Err(RuntimeError::Api("no such container".to_string())),
        }
    }

    async fn stop(&self, name: &ServiceName) -> Result<bool, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        match state.containers.get_mut(name.as_str()) {
            Some(container) => {
                let was_running = container.running;
                container.running = false;
                Ok(was_running)
            }
            None => Ok(false),
        }
    }

    async fn wait_for_exit(&self, _name: &ServiceName) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/// Records enable and disable calls instead of touching systemd.
#[derive(Default)]
pub struct FakeInit {
    pub enabled: Mutex<Vec<String>>,
    pub disabled: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeInit {
    pub fn enable_calls(&self) -> usize {
        self.enabled.lock().unwrap().len()
    }

    pub fn disable_calls(&self) -> usize {
        self.disabled.lock().unwrap().len()
    }
}

#[async_trait]
impl InitSystem for FakeInit {
    async fn enable(&self, name: &ServiceName) -> Result<(), InitError> {
        self.enabled.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn disable(&self, name: &ServiceName) -> Result<(), InitError> {
        self.disabled.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// Records notifications instead of sending them.
#[derive(Default)]
pub struct FakeNotifier {
    pub events: Mutex<Vec<(String, String, CallbackPayload)>>,
}

#[allow(dead_code)]
impl FakeNotifier {
    pub fn recorded(&self) -> Vec<(String, String, CallbackPayload)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn running(&self, uri: &str, payload: &CallbackPayload) {
        self.events
            .lock()
            .unwrap()
            .push(("running".to_string(), uri.to_string(), payload.clone()));
    }

    async fn stopped(&self, uri: &str, payload: &CallbackPayload) {
        self.events
            .lock()
            .unwrap()
            .push(("stopped".to_string(), uri.to_string(), payload.clone()));
    }
}

#[allow(dead_code)]
pub struct Harness {
    pub manager: ServiceManager,
    pub runtime: Arc<FakeRuntime>,
    pub init: Arc<FakeInit>,
    pub notifier: Arc<FakeNotifier>,
    pub registry: DeployRegistry,
    pub store: ConfigStore,
    pub layout: Layout,
}

/// Wire a service manager over fakes, with the data tree under `root`.
#[allow(dead_code)]
pub fn harness(root: &Path) -> Harness {
    harness_with(root, FakeRuntime::connected())
}

#[allow(dead_code)]
pub fn harness_with(root: &Path, runtime: FakeRuntime) -> Harness {
    let settings = LayoutSettings {
        root: root.to_path_buf(),
        ..LayoutSettings::default()
    };
    let layout = Layout::open(&settings).unwrap();
    let registry = DeployRegistry::open(layout.root()).unwrap();
    let store = ConfigStore::new(layout.config_dir());

    let runtime = Arc::new(runtime);
    let init = Arc::new(FakeInit::default());
    let notifier = Arc::new(FakeNotifier::default());

    let manager = ServiceManager::new(
        registry.clone(),
        store.clone(),
        layout.clone(),
        runtime.clone(),
        init.clone(),
        notifier.clone(),
        true,
    );

    Harness {
        manager,
        runtime,
        init,
        notifier,
        registry,
        store,
        layout,
    }
}
