//! Schedule API endpoints.
//!
//! A schedule is a titled time of day. Creating one stores it and arms a
//! one-shot reminder for the next occurrence of that time. Reminders do
//! not repeat; re-arm one with `POST /api/schedules/{id}/alarm`.
//!
//! The form endpoints mirror the two text fields of the entry form: the
//! draft survives a rejected submission and is cleared by a successful one.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use smrki_core::{Schedule, ScheduleForm, ScheduledNotification};
use utoipa::ToSchema;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the schedules router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_schedules).post(add_schedule))
        .route("/form", get(get_form).put(update_form))
        .route("/{id}/alarm", post(create_alarm))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// All schedules in creation order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "schedules": [
        {
            "id": "1736911800000",
            "title": "Take vitamins",
            "time": "09:00"
        }
    ]
}))]
pub struct SchedulesResponse {
    /// Stored schedules.
    pub schedules: Vec<Schedule>,
}

/// Partial update of the draft form. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[schema(example = json!({
    "title": "Take vitamins",
    "time": "09:00"
}))]
pub struct UpdateFormRequest {
    /// New title text.
    #[serde(default)]
    pub title: Option<String>,

    /// New time text (`HH:MM`).
    #[serde(default)]
    pub time: Option<String>,
}

/// Response after adding a schedule.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "schedule": {
        "id": "1736911800000",
        "title": "Take vitamins",
        "time": "09:00"
    },
    "reminder": {
        "id": "1736911800000",
        "message": "Take vitamins",
        "fire_at": "2025-01-16T09:00:00+01:00",
        "allow_while_idle": true
    },
    "message": "Notification scheduled at 2025-01-16 09:00"
}))]
pub struct AddScheduleResponse {
    /// The stored schedule.
    pub schedule: Schedule,

    /// The armed reminder, absent if the notifier refused it.
    pub reminder: Option<ScheduledNotification>,

    /// Confirmation text.
    pub message: String,
}

/// Response after arming a reminder.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlarmResponse {
    /// The armed reminder.
    pub reminder: ScheduledNotification,

    /// Confirmation text.
    #[schema(example = "Notification scheduled at 2025-01-16 09:00")]
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// List stored schedules.
#[utoipa::path(
    get,
    path = "/api/schedules",
    tag = "schedules",
    operation_id = "listSchedules",
    summary = "List schedules",
    responses(
        (status = 200, description = "Schedule list", body = SchedulesResponse)
    )
)]
pub async fn list_schedules(State(state): State<SharedState>) -> Json<SchedulesResponse> {
    Json(SchedulesResponse {
        schedules: state.controller.schedules().await,
    })
}

/// Read the draft form.
#[utoipa::path(
    get,
    path = "/api/schedules/form",
    tag = "schedules",
    operation_id = "getScheduleForm",
    summary = "Read the draft form",
    responses(
        (status = 200, description = "Draft form", body = ScheduleForm)
    )
)]
pub async fn get_form(State(state): State<SharedState>) -> Json<ScheduleForm> {
    Json(state.controller.form().await)
}

/// Edit the draft form.
#[utoipa::path(
    put,
    path = "/api/schedules/form",
    tag = "schedules",
    operation_id = "updateScheduleForm",
    summary = "Edit the draft form",
    request_body = UpdateFormRequest,
    responses(
        (status = 200, description = "Updated draft form", body = ScheduleForm)
    )
)]
pub async fn update_form(
    State(state): State<SharedState>,
    Json(request): Json<UpdateFormRequest>,
) -> Json<ScheduleForm> {
    apply_form_update(&state, request).await;
    Json(state.controller.form().await)
}

/// Submit the form and arm the reminder.
///
/// Fields present in the body are written to the draft first, so a client
/// can submit in one request or send `{}` to submit the current draft.
#[utoipa::path(
    post,
    path = "/api/schedules",
    tag = "schedules",
    operation_id = "addSchedule",
    summary = "Add a schedule and set its reminder",
    description = "Stores a new schedule from the draft form and arms a \
        one-shot reminder at the next occurrence of its time. Both title and \
        time must be non-empty.",
    request_body = UpdateFormRequest,
    responses(
        (status = 201, description = "Schedule added", body = AddScheduleResponse),
        (status = 400, description = "Title or time missing", body = ErrorResponse)
    )
)]
pub async fn add_schedule(
    State(state): State<SharedState>,
    Json(request): Json<UpdateFormRequest>,
) -> ApiResult<(StatusCode, Json<AddScheduleResponse>)> {
    apply_form_update(&state, request).await;
    let added = state.controller.add_schedule().await?;

    let message = added
        .reminder
        .as_ref()
        .map_or_else(|| "Schedule saved".to_string(), confirmation);
    Ok((
        StatusCode::CREATED,
        Json(AddScheduleResponse {
            schedule: added.schedule,
            reminder: added.reminder,
            message,
        }),
    ))
}

/// Arm another reminder for an existing schedule.
#[utoipa::path(
    post,
    path = "/api/schedules/{id}/alarm",
    tag = "schedules",
    operation_id = "setAlarm",
    summary = "Set the reminder for a schedule",
    description = "Arms a one-shot reminder for the schedule's next \
        occurrence. Calling this twice arms two reminders.",
    params(
        ("id" = String, Path, description = "Schedule id")
    ),
    responses(
        (status = 200, description = "Reminder armed", body = AlarmResponse),
        (status = 404, description = "Unknown schedule", body = ErrorResponse)
    )
)]
pub async fn create_alarm(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AlarmResponse>> {
    let reminder = state.controller.create_alarm_for(&id).await?;
    let message = confirmation(&reminder);
    Ok(Json(AlarmResponse { reminder, message }))
}

// ============================================================================
// Helpers
// ============================================================================

async fn apply_form_update(state: &SharedState, request: UpdateFormRequest) {
    if let Some(title) = request.title {
        state.controller.set_new_title(title).await;
    }
    if let Some(time) = request.time {
        state.controller.set_new_time(time).await;
    }
}

fn confirmation(reminder: &ScheduledNotification) -> String {
    format!(
        "Notification scheduled at {}",
        reminder.fire_at.format("%Y-%m-%d %H:%M")
    )
}
