// ABOUTME: Init-system capability for boot-time service auto-start.
// ABOUTME: Systemd implementation: unit file rendering plus systemctl calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;

use crate::layout::Layout;
use crate::settings::SystemdSettings;
use crate::types::ServiceName;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to run {command}: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Init-system operations. `enable` installs auto-start for a service,
/// `disable` removes it; both are idempotent.
#[async_trait]
pub trait InitSystem: Send + Sync {
    async fn enable(&self, name: &ServiceName) -> Result<(), InitError>;
    async fn disable(&self, name: &ServiceName) -> Result<(), InitError>;
}

/// Optional per-service hook scripts wired into generated units.
const UNIT_SCRIPTS: [(&str, &str); 3] = [
    ("ExecStartPre", "exec-start-pre.sh"),
    ("ExecStartPost", "exec-start-post.sh"),
    ("ExecStopPost", "exec-stop-post.sh"),
];

/// Systemd integration through unit files and the systemctl binary.
pub struct SystemdInit {
    unit_dir: PathBuf,
    binary: PathBuf,
    systemctl: PathBuf,
    stop_timeout_secs: u64,
    layout: Layout,
}

impl SystemdInit {
    pub fn new(settings: &SystemdSettings, layout: Layout) -> Self {
        Self {
            unit_dir: settings.unit_dir.clone(),
            binary: settings.binary.clone(),
            systemctl: settings.systemctl.clone(),
            stop_timeout_secs: settings.stop_timeout.as_secs(),
            layout,
        }
    }

    fn unit_name(name: &ServiceName) -> String {
        format!("dockhand-{name}")
    }

    fn unit_path(&self, name: &ServiceName) -> PathBuf {
        self.unit_dir.join(format!("{}.service", Self::unit_name(name)))
    }

    fn render_unit(&self, name: &ServiceName, scripts: &HashMap<String, PathBuf>) -> String {
        let binary = self.binary.display();
        let mut unit = format!(
            "#\n\
             # dockhand generated unit file\n\
             #\n\
             # DO NOT MODIFY! THIS FILE WILL BE OVERWRITTEN BY DOCKHAND!\n\
             #\n\
             [Unit]\n\
             Description=dockhand deployment of '{name}'\n\
             After=docker.service\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={binary} start --block --ignore-started {name}\n\
             ExecStop={binary} stop {name}\n\
             TimeoutStopSec={timeout}\n",
            timeout = self.stop_timeout_secs,
        );

        for (directive, _) in UNIT_SCRIPTS {
            if let Some(path) = scripts.get(directive) {
                unit.push_str(&format!("{directive}={}\n", path.display()));
            }
        }

        unit
    }

    async fn systemctl(&self, args: &[&str]) -> Result<(), InitError> {
        let output = Command::new(&self.systemctl)
            .args(args)
            .output()
            .await
            .map_err(|e| InitError::CommandFailed {
                command: format!("{} {}", self.systemctl.display(), args.join(" ")),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            tracing::warn!(
                command = %args.join(" "),
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "systemctl reported failure"
            );
        }

        Ok(())
    }

    /// Collect the hook scripts present for a service and make them
    /// executable.
    fn hook_scripts(&self, name: &ServiceName) -> Result<HashMap<String, PathBuf>, InitError> {
        let available = self
            .layout
            .load_scripts(name)
            .map_err(|e| InitError::CommandFailed {
                command: "load scripts".to_string(),
                detail: e.to_string(),
            })?;

        let mut scripts = HashMap::new();
        for (directive, file_name) in UNIT_SCRIPTS {
            if available.iter().any(|s| s == file_name) {
                let path = self.layout.script_path(name, file_name);
                fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
                scripts.insert(directive.to_string(), path);
            }
        }

        Ok(scripts)
    }
}

#[async_trait]
impl InitSystem for SystemdInit {
    async fn enable(&self, name: &ServiceName) -> Result<(), InitError> {
        let unit_path = self.unit_path(name);
        if unit_path.exists() {
            return Ok(());
        }

        let scripts = self.hook_scripts(name)?;
        let unit = self.render_unit(name, &scripts);
        fs::write(&unit_path, unit)?;

        let unit_name = Self::unit_name(name);
        self.systemctl(&["preset", &unit_name]).await?;
        self.systemctl(&["--quiet", "enable", &unit_name]).await?;

        tracing::debug!(unit = %unit_path.display(), "installed systemd unit");
        Ok(())
    }

    async fn disable(&self, name: &ServiceName) -> Result<(), InitError> {
        let unit_path = self.unit_path(name);
        if !unit_path.exists() {
            return Ok(());
        }

        let unit_name = Self::unit_name(name);
        self.systemctl(&["--quiet", "disable", &unit_name]).await?;
        fs::remove_file(&unit_path)?;
        self.systemctl(&["daemon-reload"]).await?;

        tracing::debug!(unit = %unit_path.display(), "removed systemd unit");
        Ok(())
    }
}
