// ABOUTME: Serializable result types returned by lifecycle operations.
// ABOUTME: Rendered as text or JSON by the command-line frontend.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::configs::ConfigSnapshot;
use crate::registry::DeploymentRecord;
use crate::runtime::ContainerStatus;

/// Full picture of one service: registry record, filesystem locations, and
/// the container's live status when one exists.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceView {
    pub name: String,
    pub running: bool,
    pub enabled: bool,
    pub deployment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_uri: Option<String>,
    pub config: String,
    pub config_location: PathBuf,
    pub log_location: PathBuf,
    pub script_location: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerStatus>,
}

impl fmt::Display for ServiceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name:       {}", self.name)?;
        writeln!(f, "running:    {}", self.running)?;
        writeln!(f, "enabled:    {}", self.enabled)?;
        writeln!(f, "deployment: {}", self.deployment)?;
        if let Some(uri) = &self.callback_uri {
            writeln!(f, "callback:   {uri}")?;
        }
        writeln!(f, "config:     {}", self.config)?;
        writeln!(f, "  location: {}", self.config_location.display())?;
        writeln!(f, "logs:       {}", self.log_location.display())?;
        writeln!(f, "scripts:    {}", self.script_location.display())?;
        match &self.container {
            Some(container) => {
                writeln!(f, "container:  {}", container.id)?;
                writeln!(f, "  image:    {}", container.image)?;
                writeln!(f, "  running:  {}", container.running)?;
                if let Some(started) = &container.started {
                    writeln!(f, "  started:  {started}")?;
                }
                if let Some(finished) = &container.finished {
                    writeln!(f, "  finished: {finished}")?;
                }
            }
            None => writeln!(f, "container:  <none>")?,
        }
        Ok(())
    }
}

/// One row of the service listing.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceListEntry {
    pub running: bool,
    pub enabled: bool,
    pub deployment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_uri: Option<String>,
    /// Active config name, or `None` when the pointer is broken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerStatus>,
}

impl ServiceListEntry {
    pub(crate) fn new(
        record: &DeploymentRecord,
        config: Option<String>,
        container: Option<ContainerStatus>,
    ) -> Self {
        Self {
            running: record.running,
            enabled: record.enabled,
            deployment: record.deployment.clone(),
            callback_uri: record.callback_uri.clone(),
            config,
            container,
        }
    }
}

/// All registered services, keyed by name.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceList {
    pub deploys: BTreeMap<String, ServiceListEntry>,
}

impl fmt::Display for ServiceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deploys.is_empty() {
            return writeln!(f, "no services registered.");
        }
        for (name, entry) in &self.deploys {
            let live = entry
                .container
                .as_ref()
                .map_or("absent", |c| if c.running { "up" } else { "down" });
            writeln!(
                f,
                "{name}  running={} enabled={} deployment={} container={live}",
                entry.running, entry.enabled, entry.deployment,
            )?;
        }
        Ok(())
    }
}

/// Result of creating a configuration snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigCreated {
    pub path: PathBuf,
}

impl fmt::Display for ConfigCreated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "created configuration at {}", self.path.display())
    }
}

/// Configuration snapshots of one service, ascending by modification time.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigList {
    pub configs: Vec<ConfigSnapshot>,
}

impl fmt::Display for ConfigList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for snapshot in &self.configs {
            let marker = if snapshot.current { "*" } else { " " };
            writeln!(f, "{marker} {}  {}", snapshot.name, snapshot.modified_at)?;
        }
        Ok(())
    }
}
