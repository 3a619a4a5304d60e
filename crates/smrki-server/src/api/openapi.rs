//! OpenAPI specification generation for the smrki API.
//!
//! The document is served at `/api/openapi.json` and written to disk by the
//! `gen-openapi` binary for client generation.

use axum::Json;
use smrki_core::{ControllerState, Device, Schedule, ScheduleForm, ScheduledNotification};
use utoipa::OpenApi;

use super::bluetooth::{DevicesResponse, ScanStatusResponse};
use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::notifications::NotificationsResponse;
use super::schedules::{
    AddScheduleResponse, AlarmResponse, SchedulesResponse, UpdateFormRequest,
};

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a pretty-printed string.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> serde_json::Result<String> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for smrki.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "smrki API",
        version = "0.1.0",
        description = r#"
# smrki API

smrki is a small daily helper: it lists nearby Bluetooth Low Energy devices
and keeps a list of titled reminders.

## Overview

1. **Devices**: Start a scan, then poll the device list until `scanning` is false.
   A scan stops by itself after a fixed duration.
2. **Schedules**: Fill the draft form (title and `HH:MM` time) and submit it.
   Each new schedule arms a one-shot reminder at the next occurrence of its time.
3. **Notifications**: Inspect reminders that are armed but have not fired yet.

Reminders do not repeat. Re-arm one with `POST /api/schedules/{id}/alarm`.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local smrki server")
    ),
    tags(
        (
            name = "system",
            description = "Health checks and service status"
        ),
        (
            name = "devices",
            description = "Bluetooth Low Energy device scanning"
        ),
        (
            name = "schedules",
            description = "Reminder schedules and the draft entry form"
        ),
        (
            name = "notifications",
            description = "Reminders waiting to fire"
        )
    ),
    paths(
        super::health::health_check,
        super::health::get_state,
        super::bluetooth::list_devices,
        super::bluetooth::start_scan,
        super::bluetooth::stop_scan,
        super::schedules::list_schedules,
        super::schedules::add_schedule,
        super::schedules::get_form,
        super::schedules::update_form,
        super::schedules::create_alarm,
        super::notifications::list_pending,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            ControllerState,
            // Device types
            Device,
            DevicesResponse,
            ScanStatusResponse,
            // Schedule types
            Schedule,
            ScheduleForm,
            SchedulesResponse,
            UpdateFormRequest,
            AddScheduleResponse,
            AlarmResponse,
            // Notification types
            ScheduledNotification,
            NotificationsResponse,
        )
    )
)]
pub struct ApiDoc;
