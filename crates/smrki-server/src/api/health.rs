//! Health check and state inspection endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use smrki_core::ControllerState;
use utoipa::ToSchema;

use crate::state::SharedState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "ok",
    "version": "0.1.0",
    "bluetooth_available": true,
    "scanning": false
}))]
pub struct HealthResponse {
    /// Service status.
    #[schema(example = "ok")]
    pub status: String,

    /// Service version from Cargo.toml.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Whether a Bluetooth adapter was acquired at startup.
    #[schema(example = true)]
    pub bluetooth_available: bool,

    /// Whether a scan session is running.
    #[schema(example = false)]
    pub scanning: bool,
}

/// Creates the health router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    operation_id = "healthCheck",
    summary = "Check service health",
    description = "Returns basic service status information. Use this endpoint \
        for load balancer health checks and monitoring.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        bluetooth_available: state.bluetooth_available,
        scanning: state.controller.is_scanning().await,
    })
}

/// Full application state in one read.
#[utoipa::path(
    get,
    path = "/api/state",
    tag = "system",
    operation_id = "getState",
    summary = "Read the whole application state",
    description = "Returns the device list, scanning flag, schedules and \
        draft form together, as one consistent snapshot.",
    responses(
        (status = 200, description = "Current state", body = ControllerState)
    )
)]
pub async fn get_state(State(state): State<SharedState>) -> Json<ControllerState> {
    Json(state.controller.snapshot().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            bluetooth_available: false,
            scanning: false,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"bluetooth_available\":false"));
    }
}
