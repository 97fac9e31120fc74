//! Liveness and dependency status.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::response::Envelope;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub database: bool,
    pub cache: &'static str,
    pub server_time: String,
}

/// 200 when the database answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> Envelope<HealthReport> {
    let database = state.db.health_check().await;
    let report = HealthReport {
        database,
        cache: state.cache.backend_name(),
        server_time: chrono::Utc::now().to_rfc3339(),
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Envelope::new(status, report)
}
