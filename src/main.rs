//! Flight API - A cached, rate-limited flight lookup service
//!
//! Binary entry point: wires configuration, store, cache, limiter and router.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flight_api::{
    create_router, spawn_cleanup_task, spawn_replenish_task, AppState, Config,
    SqliteFlightRepository,
};

/// Main entry point for the flight API server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Prepare the flight store schema
/// 4. Create cache, service and rate limiter
/// 5. Start background cache sweep and rate-limit window tasks
/// 6. Create Axum router with all endpoints
/// 7. Start HTTP server on configured port
/// 8. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Flight API");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        database = %config.database_path,
        absolute_ttl_secs = config.cache_absolute_ttl_secs,
        sliding_ttl_secs = config.cache_sliding_ttl_secs,
        permits = config.rate_limit_permits,
        window_secs = config.rate_limit_window_secs,
        queue = config.rate_limit_queue,
        "Configuration loaded"
    );

    let repository = Arc::new(SqliteFlightRepository::new(&config.database_path));
    repository
        .initialize_schema()
        .with_context(|| format!("failed to prepare flight store at {}", config.database_path))?;

    let state = AppState::with_repository(repository, &config);
    info!("Cache, service and rate limiter initialized");

    let tasks = vec![
        spawn_cleanup_task(state.service.cache().clone(), config.cache_scan_interval),
        spawn_replenish_task(state.limiter.clone()),
    ];
    info!("Background tasks started");

    let app = create_router(state, &config.cors_allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful shutdown.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for task in &tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
