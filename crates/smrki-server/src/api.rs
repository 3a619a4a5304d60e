//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `bluetooth` - Nearby device scanning
//! - `schedules` - Schedules, the draft form, and reminder arming
//! - `notifications` - Pending reminders
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod bluetooth;
pub mod error;
pub mod health;
pub mod notifications;
pub mod openapi;
pub mod schedules;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                   - Health check
/// /api
/// ├── /devices              - Device list, scan start and stop
/// ├── /schedules            - Schedule list, draft form, reminders
/// ├── /notifications        - Pending reminders
/// ├── /state                - Whole-state snapshot
/// └── /openapi.json         - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .nest("/devices", bluetooth::router())
                .nest("/schedules", schedules::router())
                .nest("/notifications", notifications::router())
                .route("/state", get(health::get_state))
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use smrki_core::{
        AppController, Config, ControllerSettings, MemoryStore, MockDevice, MockScanner,
        PermissionGate, PlatformPermissions, RecordingNotifier, ScheduleStore, Services,
        StaticPermissions,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::state::AppState;

    struct TestApp {
        state: SharedState,
        notifier: Arc<RecordingNotifier>,
    }

    async fn test_app_with(
        scanner: MockScanner,
        permissions: Arc<dyn PermissionGate>,
        notifier: RecordingNotifier,
        bluetooth_available: bool,
    ) -> TestApp {
        let notifier = Arc::new(notifier);
        let services = Services {
            store: ScheduleStore::new(Arc::new(MemoryStore::new())),
            notifier: notifier.clone(),
            scanner: Arc::new(scanner),
            permissions,
        };
        let config = Config::default();
        let controller = AppController::new(services, ControllerSettings::from(&config));
        controller.mount().await;
        TestApp {
            state: AppState::new(controller, config, bluetooth_available),
            notifier,
        }
    }

    async fn test_app() -> TestApp {
        test_app_with(
            MockScanner::new().with_device(MockDevice::new("AA:BB").named("Buds")),
            Arc::new(PlatformPermissions),
            RecordingNotifier::new(),
            true,
        )
        .await
    }

    async fn send(
        app: &TestApp,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = create_router(app.state.clone())
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["bluetooth_available"], true);
        assert_eq!(body["scanning"], false);
    }

    #[tokio::test]
    async fn test_add_schedule_returns_created() {
        let app = test_app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/schedules",
            Some(json!({"title": "Take vitamins", "time": "09:00"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["schedule"]["title"], "Take vitamins");
        assert_eq!(body["schedule"]["time"], "09:00");
        assert_eq!(body["reminder"]["message"], "Take vitamins");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Notification scheduled at "));
        assert_eq!(app.notifier.scheduled().await.len(), 1);

        let (_, list) = send(&app, Method::GET, "/api/schedules", None).await;
        assert_eq!(list["schedules"].as_array().unwrap().len(), 1);

        let (_, form) = send(&app, Method::GET, "/api/schedules/form", None).await;
        assert_eq!(form, json!({"title": "", "time": ""}));
    }

    #[tokio::test]
    async fn test_add_schedule_without_reminder_still_created() {
        let app = test_app_with(
            MockScanner::new(),
            Arc::new(PlatformPermissions),
            RecordingNotifier::rejecting(),
            true,
        )
        .await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/schedules",
            Some(json!({"title": "Stretch", "time": "17:00"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Schedule saved");
        assert!(body["reminder"].is_null());
        assert_eq!(body["schedule"]["title"], "Stretch");

        let (_, list) = send(&app, Method::GET, "/api/schedules", None).await;
        assert_eq!(list["schedules"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_state_snapshot() {
        let app = test_app().await;
        send(
            &app,
            Method::PUT,
            "/api/schedules/form",
            Some(json!({"title": "Half-typed"})),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/api/state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "devices": [],
                "scanning": false,
                "schedules": [],
                "form": {"title": "Half-typed", "time": ""}
            })
        );
    }

    #[tokio::test]
    async fn test_incomplete_form_is_rejected() {
        let app = test_app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/schedules",
            Some(json!({"title": "Walk"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["message"], "Fill both title and time");
        assert!(app.notifier.scheduled().await.is_empty());

        // The draft keeps what was typed.
        let (_, form) = send(&app, Method::GET, "/api/schedules/form", None).await;
        assert_eq!(form["title"], "Walk");
    }

    #[tokio::test]
    async fn test_form_edits_then_empty_submit() {
        let app = test_app().await;
        let (status, form) = send(
            &app,
            Method::PUT,
            "/api/schedules/form",
            Some(json!({"title": "Stretch"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(form, json!({"title": "Stretch", "time": ""}));

        send(
            &app,
            Method::PUT,
            "/api/schedules/form",
            Some(json!({"time": "18:30"})),
        )
        .await;
        let (status, body) = send(&app, Method::POST, "/api/schedules", Some(json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["schedule"]["title"], "Stretch");
        assert_eq!(body["schedule"]["time"], "18:30");
    }

    #[tokio::test]
    async fn test_alarm_for_existing_and_unknown_schedule() {
        let app = test_app().await;
        let (_, body) = send(
            &app,
            Method::POST,
            "/api/schedules",
            Some(json!({"title": "Read", "time": "21:00"})),
        )
        .await;
        let id = body["schedule"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/schedules/{id}/alarm"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reminder"]["id"], id.as_str());
        assert_eq!(app.notifier.scheduled().await.len(), 2);

        let (status, body) = send(&app, Method::POST, "/api/schedules/nope/alarm", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "schedule_not_found");
    }

    #[tokio::test]
    async fn test_pending_notifications_listed() {
        let app = test_app().await;
        send(
            &app,
            Method::POST,
            "/api/schedules",
            Some(json!({"title": "Water plants", "time": "07:00"})),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/api/notifications", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pending"][0]["message"], "Water plants");
    }

    #[tokio::test]
    async fn test_scan_start_then_conflict() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::POST, "/api/devices/scan", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["scanning"], true);
        assert_eq!(body["scan_duration_secs"], 8);

        let (status, body) = send(&app, Method::POST, "/api/devices/scan", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "scan_in_progress");

        let (status, body) = send(&app, Method::POST, "/api/devices/scan/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scanning"], false);

        let (_, body) = send(&app, Method::GET, "/api/devices", None).await;
        assert_eq!(body["scanning"], false);
    }

    #[tokio::test]
    async fn test_scan_permission_denied() {
        let app = test_app_with(
            MockScanner::new(),
            Arc::new(StaticPermissions::failing()),
            RecordingNotifier::new(),
            true,
        )
        .await;
        let (status, body) = send(&app, Method::POST, "/api/devices/scan", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "permission_denied");
    }

    #[tokio::test]
    async fn test_scan_without_adapter() {
        let app = test_app_with(
            MockScanner::new(),
            Arc::new(PlatformPermissions),
            RecordingNotifier::new(),
            false,
        )
        .await;
        let (status, body) = send(&app, Method::POST, "/api/devices/scan", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "bluetooth_unavailable");
    }

    #[tokio::test]
    async fn test_openapi_served() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/api/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["title"], "smrki API");
    }
}
