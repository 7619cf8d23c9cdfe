use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutorlog_api::config::ServerConfig;
use tutorlog_api::router::build_app_router;
use tutorlog_api::state::AppState;
use tutorlog_concurrency::sweep;
use tutorlog_store::{seed, JsonFileStore, MemoryStore, SharedStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutorlog_api=debug,tutorlog_concurrency=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Store ---
    let store: SharedStore = match &config.data_dir {
        Some(dir) => {
            let store = JsonFileStore::open(dir).expect("Failed to open data directory");
            tracing::info!(dir = %dir.display(), "File store opened");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATA_DIR not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    tutorlog_store::health_check(store.as_ref()).expect("Store health check failed");

    let seeded = seed::seed_if_empty(store.as_ref()).expect("Failed to seed store");
    if !seeded.is_empty() {
        tracing::info!(?seeded, "Seeded empty documents");
    }

    // --- App state ---
    let state = AppState::new(Arc::clone(&store), config.clone());

    // --- Lock sweep ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = sweep::spawn(state.locks.clone(), sweep_cancel.clone());

    let registry = Arc::clone(&state.registry);

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let cleanup_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(cleanup_timeout, sweep_handle).await;
    tracing::info!("Lock sweep stopped");

    let count = registry.connection_count().await;
    tracing::info!(count, "Closing remaining WebSocket connections");
    registry.shutdown_all().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
