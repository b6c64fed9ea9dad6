//! Gearview CLI - Main entry point
//!
//! Talks to the model generation backend from the terminal and serves the
//! built web viewer.

mod client;
mod commands;
mod config;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gearview_core::{Endpoint, PartCatalog};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::client::GenerationClient;

#[derive(Parser, Debug)]
#[command(name = "gearview")]
#[command(about = "Generate CAD parts from text and serve the Gearview web viewer")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "gearview.toml")]
    config: PathBuf,

    /// Model generation backend (overrides the config file)
    #[arg(long)]
    backend: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a part from a free-text command (e.g. "画个齿轮")
    Generate {
        text: String,
        /// Where to save the model (default: <part>.glb)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Regenerate a part with explicit parameters
    Regenerate {
        part: String,
        /// Parameter override, repeatable (e.g. --set teeth=30)
        #[arg(long = "set", value_parser = commands::parse_assignment)]
        overrides: Vec<(String, String)>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the parts, their parameters, and keywords
    Parts,
    /// Serve the web viewer, sample models, and catalog
    Serve {
        /// Bind address (overrides the config file)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
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

    info!("Gearview v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;
    if let Some(backend) = args.backend {
        config.backend.url = backend;
    }

    let catalog = match &config.catalog.path {
        Some(path) => PartCatalog::from_file(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => PartCatalog::default(),
    };
    info!(parts = catalog.part.len(), keywords = catalog.keyword.len(), "Catalog loaded");

    match args.command {
        Command::Generate { text, output } => {
            let client = backend_client(&config)?;
            commands::generate(&client, &catalog, &text, output).await?;
        }
        Command::Regenerate {
            part,
            overrides,
            output,
        } => {
            let client = backend_client(&config)?;
            commands::regenerate(&client, &catalog, &part, &overrides, output).await?;
        }
        Command::Parts => commands::list_parts(&catalog),
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let catalog_toml = catalog.to_toml()?;
            server::run(&config.server, catalog_toml).await?;
        }
    }

    Ok(())
}

fn backend_client(config: &config::Config) -> Result<GenerationClient> {
    let endpoint = Endpoint::from_address(&config.backend.url)
        .with_context(|| format!("Invalid backend address {:?}", config.backend.url))?;
    info!(backend = %endpoint.base_url(), "Using generation backend");
    GenerationClient::new(endpoint, Duration::from_secs(config.backend.timeout_secs))
}
