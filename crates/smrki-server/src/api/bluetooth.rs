//! Bluetooth device API endpoints.
//!
//! Scanning is fire-and-forget: starting a scan returns immediately and the
//! device list fills in as discoveries arrive. Poll `GET /api/devices`
//! until `scanning` turns false.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use smrki_core::Device;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the devices router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_devices))
        .route("/scan", post(start_scan))
        .route("/scan/stop", post(stop_scan))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Devices found by the current or last scan.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "devices": [
        {
            "id": "AA:BB:CC:DD:EE:FF",
            "name": "Pixel Buds"
        }
    ],
    "scanning": true
}))]
pub struct DevicesResponse {
    /// Discovered devices, first-seen order, unique by id.
    pub devices: Vec<Device>,

    /// Whether a scan session is running.
    #[schema(example = true)]
    pub scanning: bool,
}

/// Scan state after a start or stop request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "scanning": true,
    "scan_duration_secs": 8
}))]
pub struct ScanStatusResponse {
    /// Whether a scan session is running.
    #[schema(example = true)]
    pub scanning: bool,

    /// How long a session runs before it stops by itself.
    #[schema(example = 8)]
    pub scan_duration_secs: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// List discovered devices.
#[utoipa::path(
    get,
    path = "/api/devices",
    tag = "devices",
    operation_id = "listDevices",
    summary = "List discovered devices",
    description = "Returns the devices found by the current or most recent \
        scan and whether a scan is still running.",
    responses(
        (status = 200, description = "Device list", body = DevicesResponse)
    )
)]
pub async fn list_devices(State(state): State<SharedState>) -> Json<DevicesResponse> {
    let (devices, scanning) = state.controller.devices().await;
    Json(DevicesResponse { devices, scanning })
}

/// Start a scan session.
#[utoipa::path(
    post,
    path = "/api/devices/scan",
    tag = "devices",
    operation_id = "startScan",
    summary = "Start scanning for nearby devices",
    description = "Clears the device list and scans for nearby Bluetooth Low \
        Energy devices. The scan stops by itself after the configured duration.",
    responses(
        (status = 202, description = "Scan started", body = ScanStatusResponse),
        (status = 403, description = "Permissions required", body = ErrorResponse),
        (status = 409, description = "A scan is already in progress", body = ErrorResponse),
        (status = 503, description = "Bluetooth unavailable", body = ErrorResponse)
    )
)]
pub async fn start_scan(
    State(state): State<SharedState>,
) -> ApiResult<(StatusCode, Json<ScanStatusResponse>)> {
    if !state.bluetooth_available {
        return Err(ApiError::ServiceUnavailable {
            error_code: "bluetooth_unavailable".to_string(),
            message: "Bluetooth adapter is not available".to_string(),
            details: None,
        });
    }

    state.controller.start_scan().await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ScanStatusResponse {
            scanning: state.controller.is_scanning().await,
            scan_duration_secs: state.config.scan.duration_secs,
        }),
    ))
}

/// Stop the running scan early.
#[utoipa::path(
    post,
    path = "/api/devices/scan/stop",
    tag = "devices",
    operation_id = "stopScan",
    summary = "Stop the running scan",
    description = "Stops the current scan session. Stopping when no scan is \
        running has no effect.",
    responses(
        (status = 200, description = "Scan stopped", body = ScanStatusResponse)
    )
)]
pub async fn stop_scan(State(state): State<SharedState>) -> Json<ScanStatusResponse> {
    state.controller.stop_scan().await;
    Json(ScanStatusResponse {
        scanning: state.controller.is_scanning().await,
        scan_duration_secs: state.config.scan.duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devices_response_serialization() {
        let response = DevicesResponse {
            devices: vec![Device::new("AA:BB:CC:DD:EE:FF", None)],
            scanning: false,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"name\":\"Unknown\""));
        assert!(json.contains("\"scanning\":false"));
    }
}
