//! # Tillbook Server
//!
//! HTTP server for the shop backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tillbook Server                                 │
//! │                                                                         │
//! │  Browser ───► HTTP (8080) ───► Routes ───► SQLite (tillbook-db)         │
//! │     ▲                            │                                      │
//! │     │ SSE                        ▼                                      │
//! │     └──────────────────── Change feed          EmailJS ◄── Notifier     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tillbook_db::{Database, DbConfig};
use tillbook_server::{build_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Tillbook server...");

    let config = ServerConfig::load().context("Failed to load configuration")?;
    info!(
        addr = %config.bind_addr,
        db_path = %config.db_path.display(),
        email_configured = config.email.is_configured(),
        "Configuration loaded"
    );
    if !config.email.is_configured() {
        warn!("EmailJS credentials missing, invoice emails will report as failed");
    }

    if let Some(dir) = config.db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
    }

    let db = Database::new(DbConfig::new(config.db_path.clone()))
        .await
        .context("Failed to open database")?;
    info!("Database ready");

    match db.sessions().purge(Utc::now()).await {
        Ok(0) => {}
        Ok(n) => info!(count = n, "Purged expired sessions"),
        Err(e) => warn!(error = %e, "Failed to purge expired sessions"),
    }

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(db.clone(), config));
    let app = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;
    info!(addr = %bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tillbook_server=debug,tillbook_db=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
