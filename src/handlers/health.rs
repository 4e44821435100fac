//! Health check endpoints for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, services::ledger_service::LedgerService};

/// Health check response.
///
/// Returns service status and storage connectivity.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Storage backend and its status, e.g. "postgres: connected"
    pub storage: String,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Checks
///
/// - Storage connectivity (pings the ledger store)
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "storage": "postgres: connected",
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// If the store is unreachable, returns the standard error response.
pub async fn health_check(
    State(ledger): State<LedgerService>,
) -> Result<Json<HealthResponse>, AppError> {
    let store = ledger.store();
    store.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        storage: format!("{}: connected", store.backend_name()),
        timestamp: Utc::now(),
    }))
}

/// Readiness probe. Answers as soon as the router is serving.
pub async fn readiness() -> &'static str {
    "OK"
}
