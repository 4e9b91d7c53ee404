//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics};

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - Full health check. Re-probes storage on every call.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    storage::check_store(state.store.as_ref()).await;
    let report = health().report();

    Json(HealthResponse {
        status: report.status.as_str().to_string(),
        components: report.components,
        metrics: metrics().snapshot(),
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    StatusCode::OK
}
