//! Balance Ledger Service - Main Application Entry Point
//!
//! A REST API server that keeps per-account balances and their transaction
//! history. It provides endpoints to top up, debit and transfer money, and to
//! read balances (optionally converted to another currency) and history.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Open the ledger store (PostgreSQL pool + migrations, or in-memory)
//! 3. Build the rate source and ledger service
//! 4. Build HTTP router with routes and middleware
//! 5. Serve until SIGINT/SIGTERM, then drain and close the pool

use std::time::Duration;

use balance_ledger::{app, config::Config, db::DbPool, services::ledger_service::LedgerService};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        backend = ?config.storage_backend,
        currency = %config.native_currency,
        "Configuration loaded"
    );

    let opened = app::open_store(&config).await?;
    let rates = app::rate_source(&config)?;
    let ledger = LedgerService::new(opened.store, rates, config.operation_timeout());

    let router = app::router(ledger);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = opened.pool {
        close_pool(pool, config.shutdown_timeout()).await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM / SIGHUP.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(mut term), Ok(mut hup)) => {
                tokio::select! {
                    _ = term.recv() => {},
                    _ = hup.recv() => {},
                }
            }
            _ => {
                tracing::error!("Failed to install SIGTERM/SIGHUP handlers");
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

    tracing::info!("Shutdown signal received");
}

async fn close_pool(pool: DbPool, grace: Duration) {
    if tokio::time::timeout(grace, pool.close()).await.is_err() {
        tracing::error!("Database pool did not close within {:?}", grace);
    }
}
