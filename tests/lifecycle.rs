// ABOUTME: Behavioral tests for the service manager over in-memory fakes.
// ABOUTME: Covers the full lifecycle: create, deploy, start/stop, remove.

mod support;

use dockhand::configs::ENVIRONMENT_FILE_NAME;
use dockhand::lifecycle::{LifecycleError, StartOptions, StopOptions};
use dockhand::registry::RegistryError;
use dockhand::types::{ImageRef, ServiceName};
use std::fs;
use support::{FakeRuntime, harness, harness_with};
use tempfile::tempdir;

fn image(value: &str) -> ImageRef {
    ImageRef::parse(value).unwrap()
}

fn name(value: &str) -> ServiceName {
    ServiceName::new(value).unwrap()
}

#[tokio::test]
async fn create_registers_service_with_initial_config() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());

    let view = h.manager.create("web").await.unwrap();
    assert_eq!(view.name, "web");
    assert_eq!(view.config, "initial");
    assert_eq!(view.deployment, "-");
    assert!(!view.running);
    assert!(!view.enabled);
    assert!(view.container.is_none());

    assert!(view.config_location.is_dir());
    assert!(view.log_location.is_dir());
    assert!(view.script_location.is_dir());
    assert!(h.registry.exists(&name("web")).unwrap());
}

#[tokio::test]
async fn create_rejects_duplicates() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());

    h.manager.create("web").await.unwrap();
    let err = h.manager.create("web").await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Registry(RegistryError::DeployExists(n)) if n == "web"
    ));
}

#[tokio::test]
async fn illegal_name_has_no_side_effects() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());

    let err = h.manager.create("my service").await.unwrap_err();
    assert!(matches!(err, LifecycleError::IllegalServiceName(_)));

    assert!(h.registry.load().unwrap().deploys.is_empty());
    assert_eq!(h.runtime.call_count(), 0);
    assert!(!dir.path().join("config").join("my service").exists());
}

#[tokio::test]
async fn create_without_docker_still_succeeds() {
    let dir = tempdir().unwrap();
    let h = harness_with(dir.path(), FakeRuntime::disconnected());

    // The container lookup in the view is best-effort only.
    let view = h.manager.create("web").await.unwrap();
    assert!(view.container.is_none());
}

#[tokio::test]
async fn deploy_pulls_and_records_the_image() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();

    let messages = h
        .manager
        .deploy("web", &image("registry/app:v1"), Some("http://cb/hook"))
        .await
        .unwrap();
    assert!(!messages.is_empty());
    assert_eq!(h.runtime.pulled(), vec!["registry/app:v1".to_string()]);

    let record = h.registry.info(&name("web")).unwrap();
    assert_eq!(record.deployment, "registry/app:v1");
    assert_eq!(record.callback_uri.as_deref(), Some("http://cb/hook"));

    // Not enabled, so no unit was installed.
    assert_eq!(h.init.enable_calls(), 0);
}

#[tokio::test]
async fn deploy_of_latest_tag_is_refused() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();

    for img in ["registry/app", "registry/app:latest"] {
        let err = h.manager.deploy("web", &image(img), None).await.unwrap_err();
        assert!(matches!(err, LifecycleError::LatestTagDisabled));
    }

    assert!(h.runtime.pulled().is_empty());
    assert!(!h.registry.info(&name("web")).unwrap().has_image());
}

#[tokio::test]
async fn failed_pull_leaves_the_previous_deployment() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();
    h.manager
        .deploy("web", &image("registry/app:v1"), None)
        .await
        .unwrap();

    h.runtime.fail_pulls();
    let err = h
        .manager
        .deploy("web", &image("registry/app:v2"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Runtime(dockhand::runtime::RuntimeError::ImageNotAvailable { .. })
    ));

    assert_eq!(h.registry.info(&name("web")).unwrap().deployment, "registry/app:v1");
}

#[tokio::test]
async fn deploy_to_unknown_service_fails() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());

    let err = h
        .manager
        .deploy("ghost", &image("registry/app:v1"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Registry(RegistryError::NoSuchDeploy(n)) if n == "ghost"
    ));
}

#[tokio::test]
async fn enable_defers_unit_installation_until_an_image_exists() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();

    h.manager.enable("web").await.unwrap();
    assert!(h.registry.info(&name("web")).unwrap().enabled);
    assert_eq!(h.init.enable_calls(), 0);

    // Deploy catches up on the deferred installation.
    h.manager
        .deploy("web", &image("registry/app:v1"), None)
        .await
        .unwrap();
    assert_eq!(h.init.enable_calls(), 1);
}

#[tokio::test]
async fn disable_always_removes_the_unit() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();
    h.manager.enable("web").await.unwrap();

    h.manager.disable("web").await.unwrap();
    assert!(!h.registry.info(&name("web")).unwrap().enabled);
    assert_eq!(h.init.disable_calls(), 1);
}

#[tokio::test]
async fn start_without_an_image_fails() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();

    let err = h
        .manager
        .start("web", StartOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NoImageAssigned(n) if n == "web"));
    assert!(h.runtime.created().is_empty());
}

#[tokio::test]
async fn start_builds_the_container_from_config_and_environment() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();
    h.manager
        .deploy("web", &image("registry/app:v1"), Some("http://cb/hook"))
        .await
        .unwrap();

    let env_file = dir
        .path()
        .join("config")
        .join("web")
        .join("initial")
        .join(ENVIRONMENT_FILE_NAME);
    fs::write(&env_file, "PORT=8080\n").unwrap();

    h.manager.start("web", StartOptions::default()).await.unwrap();

    let container = h.runtime.container("web").unwrap();
    assert!(container.running);
    assert_eq!(container.image, "registry/app:v1");
    assert_eq!(container.env["PORT"], "8080");

    let targets: Vec<&str> = container.mounts.iter().map(|m| m.target.as_str()).collect();
    assert_eq!(targets, vec!["/data/config", "/data/log"]);
    assert!(container.mounts[0].read_only);
    assert!(!container.mounts[1].read_only);

    assert!(h.registry.info(&name("web")).unwrap().running);

    let events = h.notifier.recorded();
    assert_eq!(events.len(), 1);
    let (event, uri, payload) = &events[0];
    assert_eq!(event, "running");
    assert_eq!(uri, "http://cb/hook");
    assert_eq!(payload.name, "web");
    assert_eq!(payload.deployment, "registry/app:v1");
    assert_eq!(payload.config, "initial");
}

#[tokio::test]
async fn start_of_a_running_service_fails_unless_ignored() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();
    h.manager
        .deploy("web", &image("registry/app:v1"), None)
        .await
        .unwrap();
    h.manager.start("web", StartOptions::default()).await.unwrap();

    let err = h
        .manager
        .start("web", StartOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::ServiceIsRunning(n) if n == "web"));

    // Ignoring leaves the running container alone.
    h.manager
        .start(
            "web",
            StartOptions {
                ignore_running: true,
                ..StartOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(h.runtime.created().len(), 1);
}

#[tokio::test]
async fn stop_of_a_stopped_service_fails_unless_ignored() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();

    let err = h
        .manager
        .stop("web", StopOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::ServiceIsNotRunning(n) if n == "web"));

    // The ignored no-op must not record a state change either.
    h.manager
        .stop("web", StopOptions { ignore_stopped: true })
        .await
        .unwrap();
    assert!(!h.registry.info(&name("web")).unwrap().running);
    assert!(h.notifier.recorded().is_empty());
}

#[tokio::test]
async fn stop_halts_the_container_and_notifies() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();
    h.manager
        .deploy("web", &image("registry/app:v1"), Some("http://cb/hook"))
        .await
        .unwrap();
    h.manager.start("web", StartOptions::default()).await.unwrap();

    h.manager.stop("web", StopOptions::default()).await.unwrap();

    assert!(!h.runtime.container("web").unwrap().running);
    assert!(!h.registry.info(&name("web")).unwrap().running);

    let events = h.notifier.recorded();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].0, "stopped");
}

#[tokio::test]
async fn restart_recreates_the_container_exactly_once() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();
    h.manager
        .deploy("web", &image("registry/app:v1"), None)
        .await
        .unwrap();
    h.manager.start("web", StartOptions::default()).await.unwrap();

    h.manager.restart("web").await.unwrap();

    assert_eq!(h.runtime.created().len(), 2);
    assert_eq!(h.runtime.destroyed().len(), 1);
    assert!(h.runtime.container("web").unwrap().running);
    assert!(h.registry.info(&name("web")).unwrap().running);
}

#[tokio::test]
async fn restart_requires_a_running_service() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();

    let err = h.manager.restart("web").await.unwrap_err();
    assert!(matches!(err, LifecycleError::ServiceIsNotRunning(n) if n == "web"));
}

#[tokio::test]
async fn status_reports_a_missing_service_before_a_down_daemon() {
    let dir = tempdir().unwrap();
    let h = harness_with(dir.path(), FakeRuntime::disconnected());

    let err = h.manager.status("ghost").await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Registry(RegistryError::NoSuchDeploy(n)) if n == "ghost"
    ));

    // For a registered service the daemon check still applies.
    h.manager.create("web").await.unwrap();
    let err = h.manager.status("web").await.unwrap_err();
    assert!(matches!(err, LifecycleError::DockerNotConnected));
}

#[tokio::test]
async fn operations_fail_fast_when_the_daemon_is_down() {
    let dir = tempdir().unwrap();
    let h = harness_with(dir.path(), FakeRuntime::disconnected());
    h.manager.create("web").await.unwrap();

    let err = h
        .manager
        .start("web", StartOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::DockerNotConnected));

    let err = h.manager.list().await.unwrap_err();
    assert!(matches!(err, LifecycleError::DockerNotConnected));
}

#[tokio::test]
async fn remove_refuses_a_running_service() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();
    h.manager
        .deploy("web", &image("registry/app:v1"), None)
        .await
        .unwrap();
    h.manager.start("web", StartOptions::default()).await.unwrap();

    let err = h.manager.remove("web").await.unwrap_err();
    assert!(matches!(err, LifecycleError::ServiceIsRunning(n) if n == "web"));
    assert!(h.registry.exists(&name("web")).unwrap());
}

#[tokio::test]
async fn remove_tears_down_unit_container_record_and_directories() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();
    h.manager
        .deploy("web", &image("registry/app:v1"), None)
        .await
        .unwrap();
    h.manager.start("web", StartOptions::default()).await.unwrap();
    h.manager.stop("web", StopOptions::default()).await.unwrap();

    h.manager.remove("web").await.unwrap();

    assert_eq!(h.init.disable_calls(), 1);
    assert!(h.runtime.container("web").is_none());
    assert!(!h.registry.exists(&name("web")).unwrap());
    assert!(!dir.path().join("config").join("web").exists());
    assert!(!dir.path().join("log").join("web").exists());
    assert!(!dir.path().join("script").join("web").exists());
}

#[tokio::test]
async fn status_reports_registry_and_container_state() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();
    h.manager
        .deploy("web", &image("registry/app:v1"), None)
        .await
        .unwrap();
    h.manager.start("web", StartOptions::default()).await.unwrap();

    let view = h.manager.status("web").await.unwrap();
    assert!(view.running);
    assert_eq!(view.deployment, "registry/app:v1");
    assert_eq!(view.config, "initial");
    let container = view.container.unwrap();
    assert!(container.running);
    assert_eq!(container.image, "registry/app:v1");
}

#[tokio::test]
async fn list_covers_every_registered_service() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("api").await.unwrap();
    h.manager.create("web").await.unwrap();
    h.manager
        .deploy("web", &image("registry/app:v1"), None)
        .await
        .unwrap();
    h.manager.start("web", StartOptions::default()).await.unwrap();

    let list = h.manager.list().await.unwrap();
    assert_eq!(list.deploys.len(), 2);

    let web = &list.deploys["web"];
    assert!(web.running);
    assert_eq!(web.config.as_deref(), Some("initial"));
    assert!(web.container.as_ref().unwrap().running);

    let api = &list.deploys["api"];
    assert!(!api.running);
    assert!(api.container.is_none());
}

#[tokio::test]
async fn config_operations_manage_snapshots_through_the_manager() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();

    let created = h.manager.config_create("web", "next").unwrap();
    assert!(created.path.is_dir());

    h.manager.config_activate("web", "next").unwrap();
    assert_eq!(h.store.current(&name("web")).unwrap(), "next");

    let list = h.manager.config_list("web").unwrap();
    let names: Vec<&str> = list.configs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["initial", "next"]);
    assert!(list.configs[1].current);

    h.manager.config_remove("web", "initial").unwrap();
    assert_eq!(h.manager.config_list("web").unwrap().configs.len(), 1);
}

#[tokio::test]
async fn config_operations_validate_service_and_name() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    h.manager.create("web").await.unwrap();

    let err = h.manager.config_create("ghost", "next").unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Registry(RegistryError::NoSuchDeploy(_))
    ));

    let err = h.manager.config_create("web", "_CURRENT").unwrap_err();
    assert!(matches!(err, LifecycleError::IllegalConfigName(_)));
}

#[tokio::test]
async fn stale_container_left_by_a_crash_is_replaced_on_start() {
    let dir = tempdir().unwrap();
    let runtime = FakeRuntime::connected();
    runtime.plant_container("web", "registry/app:v0", false);
    let h = harness_with(dir.path(), runtime);

    h.manager.create("web").await.unwrap();
    h.manager
        .deploy("web", &image("registry/app:v1"), None)
        .await
        .unwrap();
    h.manager.start("web", StartOptions::default()).await.unwrap();

    assert_eq!(h.runtime.destroyed(), vec!["web".to_string()]);
    assert_eq!(h.runtime.container("web").unwrap().image, "registry/app:v1");
}
