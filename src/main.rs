//! hexlayer - an H3 hexagon data-layer server
//!
//! This is the main entry point for the hexlayer application.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{error, info};

use hexlayer::logging::{init_tracing, log_operation_end, log_operation_start};
use hexlayer::{build_router, AppState, Config, HexlayerError, Result};

fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.log_level);

    info!("Starting hexlayer v{}", env!("CARGO_PKG_VERSION"));

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(workers) = config.server.workers {
        builder.worker_threads(workers);
    }
    let runtime = builder.enable_all().build().map_err(|e| HexlayerError::Server {
        message: format!("Failed to start runtime: {}", e),
    })?;

    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<()> {
    let start = Instant::now();
    log_operation_start("catalog_load", Some(&config.data.source));
    let state = AppState::build(config.clone()).await.map_err(|e| {
        error!("Failed to load catalog: {}", e);
        e
    });
    log_operation_end("catalog_load", start, state.is_ok());
    let state = Arc::new(state?);

    info!(
        layers = state.controller.catalog().len(),
        months = state.controller.months().len(),
        "Catalog ready"
    );

    // Load the default selection in the background; the API answers meanwhile
    if let Some(ticket) = state.controller.refresh() {
        let controller = state.controller.clone();
        tokio::spawn(async move {
            let completion = controller.run(ticket).await;
            info!(completion = ?completion, "Initial dataset load finished");
        });
    }

    let app = build_router(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| HexlayerError::Config {
                message: format!("Invalid host address: {}", e),
            })?,
        config.server.port,
    ));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| HexlayerError::Server {
            message: format!("Failed to bind to address: {}", e),
        })?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| HexlayerError::Server {
            message: format!("Server error: {}", e),
        })?;

    info!("Server has been gracefully shut down");
    Ok(())
}

/// Wait for a shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
