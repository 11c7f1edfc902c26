//! Context Keeper server
//!
//! Reads configuration from the environment, connects the storage gateway,
//! and serves the REST API until SIGINT/SIGTERM.
//!
//! Usage:
//!   cargo run --bin seed_data -- --user <id>   # optional sample data
//!   cargo run --bin context_keeper             # start server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener; // For Axum bind in 0.7+

use context_keeper::auth::SupabaseVerifier;
use context_keeper::config::Config;
use context_keeper::rest::{create_router, AppState};
use context_keeper::{storage, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    // Guard flushes the file writer on drop.
    let _log_guard = telemetry::init(&config)?;

    let store = storage::connect(&config.storage).await?;
    let verifier = Arc::new(SupabaseVerifier::new(&config.identity)?);
    let app = create_router(AppState::new(store, verifier), &config.allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = %config.environment,
        backend = ?config.storage.backend,
        "context keeper listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining connections");
}
