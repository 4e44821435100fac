//! Application assembly.
//!
//! Builds the ledger store selected by configuration, the ledger service on
//! top of it, and the HTTP router that exposes the service.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    config::{Config, StorageBackend},
    db::{self, DbPool},
    handlers,
    services::{
        ledger_service::LedgerService,
        rates::{ExchangeRatesApi, RateSource},
    },
    store::{InMemoryLedgerStore, LedgerStore, PgLedgerStore},
};

/// Storage opened at startup.
///
/// The pool is kept so it can be closed on shutdown.
pub struct OpenedStore {
    pub store: Arc<dyn LedgerStore>,
    pub pool: Option<DbPool>,
}

/// Open the configured store, running migrations for PostgreSQL.
pub async fn open_store(config: &Config) -> anyhow::Result<OpenedStore> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory ledger store; balances are lost on restart");
            Ok(OpenedStore {
                store: Arc::new(InMemoryLedgerStore::new(&config.native_currency)),
                pool: None,
            })
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;

            let pool = db::create_pool(database_url, config.db_max_connections).await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            Ok(OpenedStore {
                store: Arc::new(PgLedgerStore::new(pool.clone(), &config.native_currency)),
                pool: Some(pool),
            })
        }
    }
}

/// Rate source described by the `RATES_*` settings.
pub fn rate_source(config: &Config) -> anyhow::Result<Arc<dyn RateSource>> {
    let api = ExchangeRatesApi::new(
        &config.rates_url,
        config.rates_access_key.as_deref(),
        config.rates_timeout(),
    )?;
    Ok(Arc::new(api))
}

/// Build the HTTP router around a ledger service.
///
/// # Routes
///
/// - `GET /health`, `GET /readiness` - probes
/// - `GET /api/v1/accounts/{id}/balance` - balance, optional `?currency=`
/// - `GET /api/v1/accounts/{id}/transactions` - history, optional `?sort=`
/// - `POST /api/v1/balance/top-up`, `POST /api/v1/balance/debit`
/// - `POST /api/v1/transfers`
pub fn router(ledger: LedgerService) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/v1/accounts/{id}/balance",
            get(handlers::accounts::get_balance),
        )
        .route(
            "/api/v1/accounts/{id}/transactions",
            get(handlers::accounts::get_transactions),
        )
        .route(
            "/api/v1/balance/top-up",
            post(handlers::transactions::create_top_up),
        )
        .route(
            "/api/v1/balance/debit",
            post(handlers::transactions::create_debit),
        )
        .route(
            "/api/v1/transfers",
            post(handlers::transactions::create_transfer),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readiness", get(handlers::health::readiness))
        .merge(api_routes)
        // Per-request spans for observability
        .layer(TraceLayer::new_for_http())
        // Share the ledger service with all handlers via State extraction
        .with_state(ledger)
}
