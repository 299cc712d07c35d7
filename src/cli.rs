// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(about = "Host-local lifecycle manager for containerized services")]
#[command(version)]
pub struct Cli {
    /// Settings file to use instead of the default search path
    #[arg(long = "config", id = "config_path", global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new service
    Create {
        /// Service name
        name: String,
    },

    /// Unregister a service and delete its data
    Remove {
        /// Service name
        name: String,
    },

    /// Pull an image and assign it to a service
    Deploy {
        /// Service name
        name: String,

        /// Image reference, e.g. registry/app:v1
        image: String,

        /// URI notified when the service starts or stops
        #[arg(long)]
        callback_uri: Option<String>,
    },

    /// Start a service in a fresh container
    Start {
        /// Service name
        name: String,

        /// Succeed even when the service is already running
        #[arg(long)]
        ignore_started: bool,

        /// Block until the container exits
        #[arg(long)]
        block: bool,
    },

    /// Stop a running service
    Stop {
        /// Service name
        name: String,

        /// Succeed even when the service is not running
        #[arg(long)]
        ignore_stopped: bool,
    },

    /// Stop and start a running service
    Restart {
        /// Service name
        name: String,
    },

    /// Enable boot-time auto-start for a service
    Enable {
        /// Service name
        name: String,
    },

    /// Disable boot-time auto-start for a service
    Disable {
        /// Service name
        name: String,
    },

    /// Show the full state of a service
    Status {
        /// Service name
        name: String,
    },

    /// List all registered services
    List,

    /// Manage configuration snapshots of a service
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create a new, empty configuration snapshot
    Create {
        /// Service name
        service: String,

        /// Snapshot name
        config: String,
    },

    /// Remove an inactive configuration snapshot
    Remove {
        /// Service name
        service: String,

        /// Snapshot name
        config: String,
    },

    /// Make a snapshot the active configuration
    Activate {
        /// Service name
        service: String,

        /// Snapshot name
        config: String,
    },

    /// List the configuration snapshots of a service
    List {
        /// Service name
        service: String,
    },
}
