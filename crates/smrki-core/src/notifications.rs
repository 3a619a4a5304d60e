//! One-shot local reminder notifications.
//!
//! [`NotificationScheduler`] is the platform contract. [`TimerNotifier`]
//! implements it with one tokio timer per request and hands due reminders
//! to a [`NotificationSink`] for display.
//!
//! Armed reminders live only in process memory. A restart drops every
//! reminder that has not fired yet, and mounting does not re-arm them:
//! the stored schedules carry no record of which reminders already fired.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::error::Result;
use crate::schedule::{reminder_message, resolve_fire_time};
use crate::types::Schedule;

/// A one-shot reminder handed to the notification backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "1736911800000",
    "message": "Take vitamins",
    "fire_at": "2025-01-16T09:00:00+01:00",
    "allow_while_idle": true
}))]
pub struct ScheduledNotification {
    /// Id of the schedule this reminder belongs to.
    pub id: String,

    /// Notification body.
    pub message: String,

    /// Local instant the reminder fires at.
    #[schema(value_type = String, format = DateTime)]
    pub fire_at: DateTime<Local>,

    /// Fire even while the device is in a low-power idle state.
    pub allow_while_idle: bool,
}

impl ScheduledNotification {
    /// Build the reminder for `schedule`, resolved against `now`.
    #[must_use]
    pub fn for_schedule(schedule: &Schedule, now: &DateTime<Local>) -> Self {
        Self {
            id: schedule.id.clone(),
            message: reminder_message(schedule),
            fire_at: resolve_fire_time(&schedule.time, now),
            allow_while_idle: true,
        }
    }
}

/// Local notification scheduling capability.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// One-time setup. Repeat calls are no-ops.
    fn configure(&self);

    /// Arrange for `notification` to be shown at its `fire_at` instant.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request.
    async fn schedule_at(&self, notification: ScheduledNotification) -> Result<()>;

    /// Reminders scheduled but not yet shown, in scheduling order.
    async fn pending(&self) -> Vec<ScheduledNotification>;
}

/// Where due reminders are displayed.
pub trait NotificationSink: Send + Sync {
    /// Show `notification` now.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification cannot be shown.
    fn deliver(&self, notification: &ScheduledNotification) -> Result<()>;
}

/// Sink that writes reminders to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, notification: &ScheduledNotification) -> Result<()> {
        info!(
            id = %notification.id,
            message = %notification.message,
            "Reminder due"
        );
        Ok(())
    }
}

/// Sink that shows a desktop notification.
#[cfg(feature = "desktop-notifications")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopSink;

#[cfg(feature = "desktop-notifications")]
impl NotificationSink for DesktopSink {
    fn deliver(&self, notification: &ScheduledNotification) -> Result<()> {
        notify_rust::Notification::new()
            .appname("smrki")
            .summary("smrki")
            .body(&notification.message)
            .show()
            .map(|_| ())
            .map_err(|e| crate::error::SmrkiError::NotificationFailed(e.to_string()))
    }
}

/// Timer-driven scheduler.
pub struct TimerNotifier {
    sink: Arc<dyn NotificationSink>,
    configured: AtomicBool,
    next_seq: AtomicU64,
    pending: Arc<Mutex<Vec<(u64, ScheduledNotification)>>>,
}

impl TimerNotifier {
    /// Create a scheduler delivering to `sink`.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            configured: AtomicBool::new(false),
            next_seq: AtomicU64::new(0),
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[cfg(test)]
    fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationScheduler for TimerNotifier {
    fn configure(&self) {
        if self.configured.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Notification scheduler configured");
    }

    async fn schedule_at(&self, notification: ScheduledNotification) -> Result<()> {
        let delay = (notification.fire_at - Local::now())
            .to_std()
            .unwrap_or_default();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().await.push((seq, notification.clone()));

        info!(
            id = %notification.id,
            fire_at = %notification.fire_at,
            allow_while_idle = notification.allow_while_idle,
            "Reminder scheduled"
        );

        let sink = Arc::clone(&self.sink);
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.lock().await.retain(|(s, _)| *s != seq);

            let id = notification.id.clone();
            match tokio::task::spawn_blocking(move || sink.deliver(&notification)).await {
                Ok(Ok(())) => debug!(%id, "Reminder delivered"),
                Ok(Err(e)) => warn!(%id, error = %e, "Reminder delivery failed"),
                Err(e) => warn!(%id, error = %e, "Reminder delivery task panicked"),
            }
        });
        Ok(())
    }

    async fn pending(&self) -> Vec<ScheduledNotification> {
        self.pending
            .lock()
            .await
            .iter()
            .map(|(_, n)| n.clone())
            .collect()
    }
}

/// Scheduler that only records requests, for tests.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    configure_calls: std::sync::atomic::AtomicUsize,
    scheduled: Mutex<Vec<ScheduledNotification>>,
    rejecting: bool,
}

#[cfg(any(test, feature = "testing"))]
impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that refuses every request, like a platform with
    /// notifications disabled.
    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            rejecting: true,
            ..Self::default()
        }
    }

    /// Number of times `configure` was called.
    pub fn configure_calls(&self) -> usize {
        self.configure_calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub async fn scheduled(&self) -> Vec<ScheduledNotification> {
        self.scheduled.lock().await.clone()
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl NotificationScheduler for RecordingNotifier {
    fn configure(&self) {
        self.configure_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn schedule_at(&self, notification: ScheduledNotification) -> Result<()> {
        if self.rejecting {
            return Err(crate::error::SmrkiError::NotificationFailed(
                "notifications are disabled".into(),
            ));
        }
        self.scheduled.lock().await.push(notification);
        Ok(())
    }

    async fn pending(&self) -> Vec<ScheduledNotification> {
        self.scheduled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[derive(Default)]
    struct CollectingSink {
        delivered: std::sync::Mutex<Vec<String>>,
    }

    impl NotificationSink for CollectingSink {
        fn deliver(&self, notification: &ScheduledNotification) -> Result<()> {
            self.delivered
                .lock()
                .unwrap()
                .push(notification.message.clone());
            Ok(())
        }
    }

    fn reminder(id: &str, fire_at: DateTime<Local>) -> ScheduledNotification {
        ScheduledNotification {
            id: id.into(),
            message: format!("message {id}"),
            fire_at,
            allow_while_idle: true,
        }
    }

    #[test]
    fn test_for_schedule_uses_title_and_idle_flag() {
        let schedule = Schedule {
            id: "42".into(),
            title: String::new(),
            time: "09:00".into(),
        };
        let now = Local::now();
        let n = ScheduledNotification::for_schedule(&schedule, &now);
        assert_eq!(n.id, "42");
        assert_eq!(n.message, "Reminder");
        assert!(n.allow_while_idle);
        assert!(n.fire_at >= now);
    }

    #[test]
    fn test_configure_is_idempotent() {
        let notifier = TimerNotifier::new(Arc::new(LogSink));
        assert!(!notifier.is_configured());
        notifier.configure();
        notifier.configure();
        assert!(notifier.is_configured());
    }

    #[tokio::test]
    async fn test_past_reminder_fires_immediately() {
        let sink = Arc::new(CollectingSink::default());
        let notifier = TimerNotifier::new(sink.clone());

        notifier
            .schedule_at(reminder("1", Local::now() - Duration::minutes(1)))
            .await
            .unwrap();

        for _ in 0..100 {
            if !sink.delivered.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(*sink.delivered.lock().unwrap(), vec!["message 1"]);
        assert!(notifier.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_future_reminders_stay_pending_including_duplicates() {
        let notifier = TimerNotifier::new(Arc::new(LogSink));
        let later = Local::now() + Duration::hours(1);

        notifier.schedule_at(reminder("1", later)).await.unwrap();
        notifier.schedule_at(reminder("1", later)).await.unwrap();

        let pending = notifier.pending().await;
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|n| n.id == "1"));
    }

    #[tokio::test]
    async fn test_recording_notifier_records() {
        let notifier = RecordingNotifier::new();
        notifier.configure();
        notifier
            .schedule_at(reminder("7", Local::now()))
            .await
            .unwrap();

        assert_eq!(notifier.configure_calls(), 1);
        assert_eq!(notifier.scheduled().await[0].id, "7");
    }
}
