//! # Caja Server
//!
//! HTTP API for the Caja POS register.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Caja Server                                    │
//! │                                                                         │
//! │  Register / back office ───► HTTP (3000) ───► Services ───► SQLite      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use caja_db::{Database, DbConfig};
use caja_server::config::ServerConfig;
use caja_server::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("caja=debug,tower_http=info")),
        )
        .with_target(true)
        .init();

    info!("Starting Caja POS server...");

    let config = ServerConfig::load().context("loading configuration")?;
    info!(
        addr = %config.bind_addr(),
        database = %config.database_path,
        "Configuration loaded"
    );

    let db_config = if config.is_in_memory() {
        DbConfig::in_memory()
    } else {
        DbConfig::new(&config.database_path).max_connections(config.max_connections)
    };
    let db = Database::new(db_config)
        .await
        .with_context(|| format!("opening database {}", config.database_path))?;
    info!("Database ready, migrations applied");

    let addr = config.bind_addr();
    let state = AppState::new(db.clone(), config);
    let app = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
