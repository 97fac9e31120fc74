//! # Market API server
//!
//! ```text
//! .env ──► ApiConfig ──► Database (migrations) ──► ListCache ──► AppState
//!                                                                  │
//!                              axum::serve ◄── app(state) ◄────────┘
//!                                   │
//!                     Ctrl+C / SIGTERM ──► graceful shutdown ──► pool closed
//! ```

use anyhow::Context;
use market_api::{app, ApiConfig, AppState, ListCache};
use market_db::{Database, DbConfig};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside local development
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,market_api=debug,market_db=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Market API server...");

    let config = ApiConfig::load().context("Failed to load configuration")?;
    info!(
        addr = %config.bind_address(),
        database = %config.database_path,
        deadline_ms = config.request_deadline.as_millis() as u64,
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(&config.database_path).max_connections(config.db_max_connections))
        .await
        .context("Failed to open database")?;
    info!("Database ready");

    let cache = ListCache::connect(&config).await;
    let bind_addr = config.bind_address();
    let state = AppState::new(db.clone(), cache, config);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "HTTP server listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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
