//! Runs the delivery service against the in-memory store until interrupted.
//!
//! Production deployments adapt their own document database, transport,
//! renderer, and directory behind the crate's traits; this entrypoint wires
//! the in-memory implementations for development.

use std::sync::Arc;

use lettermill_common::{Signal, config::Config, logging};
use lettermill_delivery::{DeliveryService, Mailer, MemoryMailer};
use lettermill_spool::{DocumentStore, MemoryDocumentStore};
use tokio::sync::broadcast;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = find_config_file()?;
    let config = Config::from_path(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config from {}: {e}", config_path.display()))?;

    logging::init();
    info!(config = %config_path.display(), "Loaded configuration");

    let store = Arc::new(MemoryDocumentStore::new());
    let changes = store.subscribe();

    let service = DeliveryService::new(
        &config,
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        Arc::new(MemoryMailer::new()) as Arc<dyn Mailer>,
    );

    let (shutdown, shutdown_rx) = broadcast::channel(64);
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown(shutdown).await {
            error!(error = %e, "Shutdown listener failed");
        }
    });

    service.serve(changes, shutdown_rx).await?;

    Ok(())
}

async fn wait_for_shutdown(shutdown: broadcast::Sender<Signal>) -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            info!("Terminate signal received, shutting down");
        }
    }

    shutdown
        .send(Signal::Shutdown)
        .map_err(|e| anyhow::anyhow!("No service listening for shutdown: {e}"))?;

    Ok(())
}

/// Find the configuration file using the following precedence:
/// 1. `LETTERMILL_CONFIG` environment variable
/// 2. ./lettermill.toml (current working directory)
/// 3. /etc/lettermill/lettermill.toml (system-wide config)
fn find_config_file() -> anyhow::Result<std::path::PathBuf> {
    if let Ok(env_path) = std::env::var("LETTERMILL_CONFIG") {
        let path = std::path::PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!(
            "LETTERMILL_CONFIG points to non-existent file: {}",
            path.display()
        );
    }

    let default_paths = vec![
        std::path::PathBuf::from("./lettermill.toml"),
        std::path::PathBuf::from("/etc/lettermill/lettermill.toml"),
    ];

    for path in &default_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - LETTERMILL_CONFIG environment variable\n{paths_tried}"
    )
}
