//! # zwsync
//!
//! Run a Z-Wave node directory session and serve it over HTTP.
//!
//! ## Commands
//!
//! - `serve`: start a driver session, keep the directory in sync, serve requests
//! - `validate`: check a configuration file
//!
//! ## Example
//!
//! ```bash
//! # Check the config
//! zwsync --config zwsync.toml validate
//!
//! # Run against the in-process driver, replaying a recorded notification script
//! RUST_LOG=debug zwsync serve --replay notifications.jsonl
//!
//! # Inspect
//! curl localhost:8080/nodes
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use zwave_sync_manager::Config;

mod commands;

use commands::{serve, validate};

/// Config file used when `--config` is not given.
const DEFAULT_CONFIG: &str = "zwsync.toml";

/// Run a Z-Wave node directory session.
#[derive(Parser, Debug)]
#[command(name = "zwsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ./zwsync.toml if present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a driver session and serve the node directory
    Serve {
        /// Controller device path (overrides session.controller_path)
        #[arg(long)]
        controller: Option<String>,

        /// JSON-lines notification script fed to the driver after startup
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Do not start the HTTP server
        #[arg(long)]
        no_http: bool,
    },

    /// Check a configuration file and print the effective settings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            controller,
            replay,
            no_http,
        } => {
            serve::run(config, controller, replay.as_deref(), no_http)
                .await?;
        }
        Commands::Validate => {
            validate::run(&config);
        }
    }

    Ok(())
}

/// Load the named config file, or `zwsync.toml` if it exists, or defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default = Path::new(DEFAULT_CONFIG);
    if default.exists() {
        return Config::from_file(default)
            .context("Failed to load zwsync.toml");
    }

    info!("no config file, using defaults");
    Ok(Config::default())
}
