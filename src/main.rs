//! Application gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 APP GATEWAY                  │
//!                         │                                              │
//!   Front-end server      │  ┌──────────┐   ┌───────────┐   ┌─────────┐  │
//!   (+ !~ headers)  ──────┼─▶│  http    │──▶│ admission │──▶│ options │  │
//!                         │  │  server  │   │  pipeline │   │  cache  │  │
//!                         │  └────┬─────┘   └─────┬─────┘   └─────────┘  │
//!                         │       │               │ sticky id            │
//!                         │       ▼               ▼                      │
//!   Response        ◀─────┼── upstream map ◀── hand-off ───────────────┼──▶ App backend
//!                         └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use app_gateway::admission::{AdmissionPipeline, LogAnalyticsCore};
use app_gateway::config::{load_config, GatewayConfig};
use app_gateway::detect::FsAppTypeDetector;
use app_gateway::observability::{logging, metrics};
use app_gateway::{GatewayServer, Shutdown};

#[derive(Parser)]
#[command(name = "app-gateway", version, about = "Application gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("app-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        single_app = config.single_app_mode(),
        upstreams = config.upstreams.len(),
        analytics = config.analytics.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let config = Arc::new(config);
    let mut pipeline = AdmissionPipeline::new(Arc::clone(&config), Arc::new(FsAppTypeDetector));
    if config.analytics.enabled {
        pipeline = pipeline.with_analytics(Arc::new(LogAnalyticsCore::new()));
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    shutdown.trigger_on_ctrl_c();

    GatewayServer::new(config, pipeline)?
        .run(listener, shutdown.signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
