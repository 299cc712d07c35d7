// ABOUTME: Tool settings loaded from dockhand.yml with serde defaults.
// ABOUTME: Covers data-tree layout, docker socket, systemd, and callbacks.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub layout: LayoutSettings,

    #[serde(default)]
    pub docker: DockerSettings,

    #[serde(default)]
    pub systemd: SystemdSettings,

    #[serde(default)]
    pub callback: CallbackSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Root of the managed data tree.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_config_dir")]
    pub config_dir: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_script_dir")]
    pub script_dir: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            root: default_root(),
            config_dir: default_config_dir(),
            log_dir: default_log_dir(),
            script_dir: default_script_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DockerSettings {
    /// Unix socket path of the docker daemon.
    #[serde(default = "default_socket")]
    pub socket: PathBuf,

    /// Refuse deploys of images resolving the mutable `latest` tag.
    #[serde(default = "default_true")]
    pub disable_latest_tag: bool,
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            disable_latest_tag: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemdSettings {
    /// Directory unit files are installed into.
    #[serde(default = "default_unit_dir")]
    pub unit_dir: PathBuf,

    /// Path of this tool as invoked from unit files.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_systemctl")]
    pub systemctl: PathBuf,

    /// TimeoutStopSec for generated units.
    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,
}

impl Default for SystemdSettings {
    fn default() -> Self {
        Self {
            unit_dir: default_unit_dir(),
            binary: default_binary(),
            systemctl: default_systemctl(),
            stop_timeout: default_stop_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallbackSettings {
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(default = "default_read_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Kill switch: skip all outbound notifications.
    #[serde(default)]
    pub ignore_callbacks: bool,
}

impl Default for CallbackSettings {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            ignore_callbacks: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("/var/lib/dockhand")
}

fn default_config_dir() -> String {
    "config".to_string()
}

fn default_log_dir() -> String {
    "log".to_string()
}

fn default_script_dir() -> String {
    "script".to_string()
}

fn default_socket() -> PathBuf {
    PathBuf::from("/var/run/docker.sock")
}

fn default_true() -> bool {
    true
}

fn default_unit_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}

fn default_binary() -> PathBuf {
    PathBuf::from("/usr/bin/dockhand")
}

fn default_systemctl() -> PathBuf {
    PathBuf::from("/usr/bin/systemctl")
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self, SettingsError> {
        serde_yaml::from_str(yaml).map_err(SettingsError::from)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load the first settings file found, falling back to built-in
    /// defaults when none exists.
    pub fn discover() -> Result<Self, SettingsError> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(home) = std::env::var_os("HOME") {
            candidates.push(PathBuf::from(home).join(".dockhand.yml"));
        }
        candidates.push(PathBuf::from("/usr/local/etc/dockhand.yml"));
        candidates.push(PathBuf::from("/etc/dockhand.yml"));

        for path in &candidates {
            if path.is_file() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }
}
