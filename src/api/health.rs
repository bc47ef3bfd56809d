//! Health check endpoint

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `UP` while the process serves requests
    pub status: String,
    /// Server time
    pub time: DateTime<Utc>,
    /// Version of the service
    pub version: String,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health/status",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_status() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        time: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
