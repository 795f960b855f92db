//! cdictl - List and resolve CDI devices
//!
//! Thin front end over the `cdi-core` registry.

mod commands;
mod config;

use anyhow::Result;
use cdi_core::Registry;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "cdictl")]
#[command(about = "Inspect Container Device Interface specifications")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cdictl.toml")]
    config: PathBuf,

    /// Directories to scan for CDI specifications, highest priority first
    #[arg(long = "spec-dir", global = true, env = "CDI_SPEC_DIRS", value_delimiter = ':')]
    spec_dirs: Vec<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available CDI devices
    List,
    /// Print the container edits for the given devices as JSON
    Resolve {
        /// Qualified device names (vendor/class=name)
        #[arg(required = true)]
        devices: Vec<String>,
    },
    /// Print all errors found while loading specifications
    Errors,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = config::load_config(&args.config)?;
    let registry_config = config::registry_config(&config, &args.spec_dirs)?;
    debug!(
        dirs = ?registry_config.spec_dirs,
        auto_refresh = registry_config.auto_refresh,
        "Registry configuration"
    );

    let registry = Registry::new(registry_config)?;
    let mut stdout = std::io::stdout().lock();

    match args.command {
        Command::List => commands::list(&registry, &mut stdout),
        Command::Resolve { devices } => commands::resolve(&registry, &devices, &mut stdout),
        Command::Errors => commands::errors(&registry, &mut stdout),
    }
}
