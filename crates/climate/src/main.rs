//! Climate Controller Server
//!
//! Closed-loop HVAC controller with an HTTP operator surface.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use climate::config::ClimateConfig;
use climate::server::{create_router, AppState};
use climate::{BusCommandPublisher, ControllerService, MessageBus};
use climate_engine::{SharedClimate, SystemClock};

/// Closed-loop climate controller
#[derive(Parser, Debug)]
#[command(name = "climate")]
#[command(about = "Closed-loop HVAC climate controller", long_about = None)]
struct Args {
    /// Path to a TOML config file (defaults to ./climate.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host address
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Initial set-point
    #[arg(long)]
    set_point: Option<f64>,
}

fn main() -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = Args::parse();

    let mut config = ClimateConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(set_point) = args.set_point {
        config.controller.initial_set_point = Some(set_point);
    }
    config.validate()?;

    climate::telemetry::init(config.log.format);
    info!("Starting climate controller v{}", env!("CARGO_PKG_VERSION"));

    // Core components
    let bus = MessageBus::default();
    let publisher = BusCommandPublisher::new(bus.clone(), &config.topics);
    let climate = SharedClimate::new(
        &config.engine_config(),
        Arc::new(SystemClock),
        Arc::new(publisher),
    );

    if let Some(set_point) = config.controller.initial_set_point {
        info!(set_point, "Using initial set-point");
        climate.set_set_point(set_point);
    }

    // Ingress worker
    let mut service = ControllerService::new(climate.clone(), bus.clone(), config.topics.clone());
    if let Some(interval) = config.controller.reevaluate_interval() {
        info!(?interval, "Periodic re-evaluation enabled");
        service = service.with_reevaluate_interval(interval);
    }
    let controller = service.spawn();

    // Operator API
    let app = create_router(AppState::new(climate));
    let addr: SocketAddr = config.server.bind_addr().parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Stopping controller...");
    if let Err(e) = controller.shutdown(Duration::from_secs(5)).await {
        warn!("Controller did not shut down cleanly: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
