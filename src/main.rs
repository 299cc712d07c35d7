// ABOUTME: Entry point for the dockhand CLI application.
// ABOUTME: Parses arguments, wires up the service manager, and dispatches.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, ConfigCommands};
use dockhand::configs::ConfigStore;
use dockhand::error::Result;
use dockhand::init_system::SystemdInit;
use dockhand::layout::Layout;
use dockhand::lifecycle::{LifecycleError, ServiceManager, StartOptions, StopOptions};
use dockhand::notify::HttpNotifier;
use dockhand::registry::DeployRegistry;
use dockhand::runtime::DockerRuntime;
use dockhand::settings::Settings;
use dockhand::types::ImageRef;
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::discover()?,
    };

    let layout = Layout::open(&settings.layout)?;
    let registry = DeployRegistry::open(layout.root())?;
    let store = ConfigStore::new(layout.config_dir());
    let runtime = Arc::new(DockerRuntime::connect(&settings.docker.socket));
    let init = Arc::new(SystemdInit::new(&settings.systemd, layout.clone()));
    let notifier = Arc::new(HttpNotifier::new(&settings.callback));

    let manager = ServiceManager::new(
        registry,
        store,
        layout,
        runtime,
        init,
        notifier,
        settings.docker.disable_latest_tag,
    );

    let json = cli.json;
    match cli.command {
        Commands::Create { name } => {
            let view = manager.create(&name).await?;
            print_view(&view, json)?;
        }
        Commands::Remove { name } => {
            manager.remove(&name).await?;
            println!("removed '{name}'.");
        }
        Commands::Deploy {
            name,
            image,
            callback_uri,
        } => {
            let image = ImageRef::parse(&image).map_err(LifecycleError::from)?;
            let messages = manager
                .deploy(&name, &image, callback_uri.as_deref())
                .await?;
            for message in messages {
                println!("{message}");
            }
            println!("deployed '{image}' to '{name}'.");
        }
        Commands::Start {
            name,
            ignore_started,
            block,
        } => {
            let options = StartOptions {
                ignore_running: ignore_started,
                block,
            };
            manager.start(&name, options).await?;
        }
        Commands::Stop {
            name,
            ignore_stopped,
        } => {
            manager.stop(&name, StopOptions { ignore_stopped }).await?;
        }
        Commands::Restart { name } => {
            manager.restart(&name).await?;
        }
        Commands::Enable { name } => {
            manager.enable(&name).await?;
        }
        Commands::Disable { name } => {
            manager.disable(&name).await?;
        }
        Commands::Status { name } => {
            let view = manager.status(&name).await?;
            print_view(&view, json)?;
        }
        Commands::List => {
            let list = manager.list().await?;
            print_view(&list, json)?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Create { service, config } => {
                let created = manager.config_create(&service, &config)?;
                print_view(&created, json)?;
            }
            ConfigCommands::Remove { service, config } => {
                manager.config_remove(&service, &config)?;
            }
            ConfigCommands::Activate { service, config } => {
                manager.config_activate(&service, &config)?;
            }
            ConfigCommands::List { service } => {
                let list = manager.config_list(&service)?;
                print_view(&list, json)?;
            }
        },
    }

    Ok(())
}

fn print_view<T: Serialize + std::fmt::Display>(view: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
    } else {
        print!("{view}");
    }
    Ok(())
}
