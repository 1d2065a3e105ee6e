//! memvault - An in-process key/value cache server
//!
//! Bounded caching with LRU eviction, TTL expiration, version-aware
//! invalidation, opportunistic encryption, and a pressure-driven GC,
//! exposed over an HTTP API.

mod api;
mod cache;
mod config;
mod error;
mod models;
mod tasks;

use std::net::SocketAddr;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{create_router, AppState};
use config::Config;
use tasks::{spawn_cleanup_task, spawn_stats_task};

/// Main entry point for the memvault cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache engine with configured parameters
/// 4. Start background cleanup/GC and stats tasks
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memvault=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting memvault cache server");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        max_entries = config.max_entries,
        max_memory = config.max_memory,
        default_ttl = config.default_ttl,
        version_aware = config.version_aware_mode,
        encryption = config.encryption_enabled,
        port = config.server_port,
        "Configuration loaded"
    );

    // Build the engine; a bad configuration record is fatal
    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    info!("Cache engine initialized");

    // Start background tasks
    let cleanup_handle = spawn_cleanup_task(
        state.engine.clone(),
        Duration::from_millis(config.check_interval_ms),
    );
    let stats_handle = spawn_stats_task(
        state.engine.clone(),
        Duration::from_millis(config.stats_interval_ms),
    );
    info!("Background tasks started");

    // Create router with all endpoints
    let engine = state.engine.clone();
    let app = create_router(state);

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle, stats_handle))
        .await
        .unwrap();

    // Tear down watchers and cached state
    engine.destroy().await;
    info!("Server shutdown complete");
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful
/// shutdown.
async fn shutdown_signal(
    cleanup_handle: tokio::task::JoinHandle<()>,
    stats_handle: tokio::task::JoinHandle<()>,
) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
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

    // Abort the background tasks
    cleanup_handle.abort();
    stats_handle.abort();
    warn!("Background tasks aborted");
}
