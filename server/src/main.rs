// bbox_sync/server/src/main.rs
use bbox_sync_core::core::config::SyncConfig;
use bbox_sync_core::network::transport::TracingTransport;
use bbox_sync_core::operational::monitoring::metrics::{init_logging, MetricsSystem};
use bbox_sync_core::server::instance::BoundingBoxServer;

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

fn load_config() -> anyhow::Result<SyncConfig> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            SyncConfig::load(&path)?
        }
        None => SyncConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {:?}", e);
        return Err(e);
    }

    info!("Bounding box sync server starting up...");

    let config = Arc::new(load_config()?);
    info!("Configuration loaded. Tick rate: {}", config.tick_rate);

    let metrics_system = MetricsSystem::new(config.metrics_listen_addr)?;
    if let Some(addr) = config.metrics_listen_addr {
        info!("Prometheus metrics exposed on {}", addr);
    }

    let server = Arc::new(BoundingBoxServer::new(config.clone(), Arc::new(TracingTransport)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sync_handle = tokio::spawn(server.clone().run_sync_loop(shutdown_rx));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown requested after {:.1}s", metrics_system.uptime_seconds());
    let _ = shutdown_tx.send(true);

    if let Err(e) = sync_handle.await {
        error!("Sync loop task failed: {}", e);
    }
    server.reset();
    Ok(())
}
