//! Pending reminder API endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use smrki_core::ScheduledNotification;
use utoipa::ToSchema;

use crate::state::SharedState;

/// Creates the notifications router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(list_pending))
}

/// Reminders armed but not yet delivered.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationsResponse {
    /// Pending reminders, earliest first.
    pub pending: Vec<ScheduledNotification>,
}

/// List pending reminders.
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "notifications",
    operation_id = "listPendingNotifications",
    summary = "List pending reminders",
    description = "Returns every reminder that has been armed and has not \
        fired yet. Delivered reminders are removed from this list.",
    responses(
        (status = 200, description = "Pending reminders", body = NotificationsResponse)
    )
)]
pub async fn list_pending(State(state): State<SharedState>) -> Json<NotificationsResponse> {
    let mut pending = state.controller.pending_reminders().await;
    pending.sort_by_key(|n| n.fire_at);
    Json(NotificationsResponse { pending })
}
