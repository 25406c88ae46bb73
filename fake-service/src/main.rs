//! fake-service binary entry point.
//!
//! Usage:
//! ```bash
//! fake-service --config fake-service.toml
//! fake-service --listen 127.0.0.1:9091
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use fake_service::config::Config;
use fake_service::http::build_router;
use fake_service::load::LoadGenerator;
use fake_service::service::FakeService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "fake-service.toml";

/// Service topology emulator.
#[derive(Parser, Debug)]
#[command(name = "fake-service")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults apply if the default file is missing)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Bind address, overriding the configured one
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config)?;
    if let Some(listen) = cli.listen {
        config.service.listen = listen;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config.validate().context("Invalid configuration")?;

    let service = FakeService::from_config(&config).context("Failed to create service")?;
    tracing::info!(
        name = service.name(),
        upstreams = config.service.upstream_uris.len(),
        addresses = ?service.ip_addresses(),
        "Service configured"
    );

    // Memory held for the whole process, reported with the per-request loops
    let process_load = match config
        .process_generator_config()
        .context("Invalid configuration")?
    {
        Some(load) => {
            let generator = LoadGenerator::with_stats(Arc::new(load), service.load().clone());
            Some(generator.generate().context("Failed to start process load")?)
        }
        None => None,
    };

    let listener = tokio::net::TcpListener::bind(&config.service.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.service.listen))?;
    tracing::info!("Listening on {}", config.service.listen);

    axum::serve(listener, build_router(Arc::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = process_load {
        handle.join().await;
    }
    tracing::info!("Shut down");
    Ok(())
}

/// Load the given file, or the default file if it exists, or defaults.
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };
    Config::from_file(&path).context("Failed to load configuration")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
