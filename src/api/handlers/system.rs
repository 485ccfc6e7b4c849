//! System endpoints: health check.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::HealthResponse;
use crate::app_state::AppState;

/// `GET /v1/healthcheck`: Liveness probe.
#[utoipa::path(
    get,
    path = "/v1/healthcheck",
    tag = "System",
    summary = "Health check",
    description = "Returns `{\"healthy\": true}` while the process is serving requests. Does not touch the database.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn healthcheck() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { healthy: true }))
}

/// System routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/healthcheck", get(healthcheck))
}
