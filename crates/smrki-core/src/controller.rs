//! Application controller.
//!
//! Owns the UI state (device list, schedule list, form fields, scanning
//! flag) and mediates between user actions and the leaf services. The
//! leaves never talk to each other; every interaction goes through here.
//!
//! Only two failures reach the caller as alerts: permission denial on
//! [`AppController::start_scan`] and an incomplete form on
//! [`AppController::add_schedule`]. Everything else is logged and dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::bluetooth::{DeviceScanner, ScanEvent};
use crate::config::Config;
use crate::error::{Result, SmrkiError};
use crate::notifications::{NotificationScheduler, ScheduledNotification};
use crate::permissions::{ensure_scan_permissions, PermissionGate, PermissionPolicy};
use crate::schedule::{new_schedule, validate_form};
use crate::storage::ScheduleStore;
use crate::types::{push_unique_device, Device, Schedule, ScheduleForm};

/// The leaf services the controller drives.
#[derive(Clone)]
pub struct Services {
    /// Schedule persistence.
    pub store: ScheduleStore,
    /// Local notification scheduling.
    pub notifier: Arc<dyn NotificationScheduler>,
    /// Radio scanning capability, released on unmount.
    pub scanner: Arc<dyn DeviceScanner>,
    /// Runtime permission prompt.
    pub permissions: Arc<dyn PermissionGate>,
}

/// Tunables taken from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// How long a scan session runs.
    pub scan_duration: Duration,
    /// How permission reports are judged.
    pub permission_policy: PermissionPolicy,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            scan_duration: config.scan.duration(),
            permission_policy: config.permissions.policy,
        }
    }
}

/// In-memory UI state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ControllerState {
    /// Devices found by the current or last scan.
    pub devices: Vec<Device>,
    /// Whether a scan session is running.
    pub scanning: bool,
    /// All schedules, in creation order.
    pub schedules: Vec<Schedule>,
    /// Draft form fields.
    pub form: ScheduleForm,
}

/// Result of a successful [`AppController::add_schedule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedSchedule {
    /// The stored schedule.
    pub schedule: Schedule,
    /// The reminder that was armed, if the notifier accepted it.
    pub reminder: Option<ScheduledNotification>,
}

/// Shared handle to the controller. Cloning is cheap.
#[derive(Clone)]
pub struct AppController {
    inner: Arc<Inner>,
}

struct Inner {
    state: RwLock<ControllerState>,
    services: Services,
    settings: ControllerSettings,
    configured: AtomicBool,
    scan_generation: AtomicU64,
    session: Mutex<Option<JoinHandle<()>>>,
}

impl AppController {
    /// Create a controller with empty state. Call [`Self::mount`] next.
    pub fn new(services: Services, settings: ControllerSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(ControllerState::default()),
                services,
                settings,
                configured: AtomicBool::new(false),
                scan_generation: AtomicU64::new(0),
                session: Mutex::new(None),
            }),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Load persisted schedules and configure notifications.
    ///
    /// A load failure is logged and leaves the schedule list as it was.
    #[instrument(skip(self))]
    pub async fn mount(&self) {
        match self.inner.services.store.load().await {
            Ok(schedules) => {
                info!(count = schedules.len(), "Loaded schedules");
                self.inner.state.write().await.schedules = schedules;
            }
            Err(e) => warn!(error = %e, "Failed to load schedules"),
        }

        if !self.inner.configured.swap(true, Ordering::SeqCst) {
            self.inner.services.notifier.configure();
        }
    }

    /// Stop any running scan and release the radio.
    #[instrument(skip(self))]
    pub async fn unmount(&self) {
        self.end_session().await;
        self.inner.services.scanner.destroy().await;
        info!("Controller unmounted");
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    /// Start a scan session.
    ///
    /// Clears the device list, then collects discoveries until the session
    /// duration elapses, the scanner fails, or [`Self::stop_scan`] is called.
    ///
    /// # Errors
    ///
    /// - [`SmrkiError::PermissionDenied`] if the radio permissions are refused
    /// - [`SmrkiError::ScanInProgress`] if a session is already running
    #[instrument(skip(self))]
    pub async fn start_scan(&self) -> Result<()> {
        if self.inner.state.read().await.scanning {
            return Err(SmrkiError::ScanInProgress);
        }

        ensure_scan_permissions(
            self.inner.services.permissions.as_ref(),
            self.inner.settings.permission_policy,
        )
        .await?;

        let mut state = self.inner.state.write().await;
        if state.scanning {
            return Err(SmrkiError::ScanInProgress);
        }
        state.devices.clear();
        state.scanning = true;
        let generation = self.inner.scan_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let deadline = Instant::now() + self.inner.settings.scan_duration;

        // The handle is stored before the state lock is released, so a
        // stop request always finds the session it has to cancel.
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            inner.run_session(generation, deadline).await;
        });
        if let Some(previous) = self.inner.session.lock().await.replace(handle) {
            previous.abort();
        }
        drop(state);

        info!(
            duration_secs = self.inner.settings.scan_duration.as_secs(),
            "Scan started"
        );
        Ok(())
    }

    /// Stop the running scan early. A no-op when idle.
    #[instrument(skip(self))]
    pub async fn stop_scan(&self) {
        self.end_session().await;
    }

    async fn end_session(&self) {
        let handle = {
            let _state = self.inner.state.write().await;
            self.inner.session.lock().await.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
        let generation = self.inner.scan_generation.load(Ordering::SeqCst);
        self.inner.finish_scan(generation).await;
    }

    // ========================================================================
    // Schedules
    // ========================================================================

    /// Replace the draft title.
    pub async fn set_new_title(&self, title: impl Into<String>) {
        self.inner.state.write().await.form.title = title.into();
    }

    /// Replace the draft time.
    pub async fn set_new_time(&self, time: impl Into<String>) {
        self.inner.state.write().await.form.time = time.into();
    }

    /// Submit the form: store a new schedule and arm its reminder.
    ///
    /// On success the full list is persisted and the form is cleared. A
    /// persistence or notifier failure is logged and does not undo the add.
    ///
    /// # Errors
    ///
    /// Returns [`SmrkiError::ValidationFailed`] if either form field is
    /// empty. Nothing changes in that case.
    #[instrument(skip(self))]
    pub async fn add_schedule(&self) -> Result<AddedSchedule> {
        let schedule = {
            let mut state = self.inner.state.write().await;
            validate_form(&state.form)?;

            let schedule = new_schedule(
                &state.form,
                Utc::now().timestamp_millis(),
                &state.schedules,
            );
            state.schedules.push(schedule.clone());
            if let Err(e) = self.inner.services.store.save(&state.schedules).await {
                warn!(error = %e, "Failed to persist schedules");
            }
            state.form = ScheduleForm::default();
            schedule
        };
        info!(id = %schedule.id, time = %schedule.time, "Schedule added");

        let reminder = match self.create_alarm_from_schedule(&schedule).await {
            Ok(reminder) => Some(reminder),
            Err(e) => {
                warn!(id = %schedule.id, error = %e, "Failed to arm reminder");
                None
            }
        };
        Ok(AddedSchedule { schedule, reminder })
    }

    /// Arm a reminder for an existing schedule.
    ///
    /// Calling this twice arms two reminders.
    ///
    /// # Errors
    ///
    /// Returns an error if the notifier rejects the request.
    pub async fn create_alarm_from_schedule(
        &self,
        schedule: &Schedule,
    ) -> Result<ScheduledNotification> {
        let reminder = ScheduledNotification::for_schedule(schedule, &Local::now());
        self.inner
            .services
            .notifier
            .schedule_at(reminder.clone())
            .await?;
        Ok(reminder)
    }

    /// Arm a reminder for the schedule with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SmrkiError::ScheduleNotFound`] for an unknown id, or the
    /// notifier's error.
    pub async fn create_alarm_for(&self, id: &str) -> Result<ScheduledNotification> {
        let schedule = self
            .inner
            .state
            .read()
            .await
            .schedules
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| SmrkiError::ScheduleNotFound(id.to_string()))?;
        self.create_alarm_from_schedule(&schedule).await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Copy of the full state.
    pub async fn snapshot(&self) -> ControllerState {
        self.inner.state.read().await.clone()
    }

    /// Current device list and scanning flag.
    pub async fn devices(&self) -> (Vec<Device>, bool) {
        let state = self.inner.state.read().await;
        (state.devices.clone(), state.scanning)
    }

    /// Whether a scan session is running.
    pub async fn is_scanning(&self) -> bool {
        self.inner.state.read().await.scanning
    }

    /// All schedules, in creation order.
    pub async fn schedules(&self) -> Vec<Schedule> {
        self.inner.state.read().await.schedules.clone()
    }

    /// Draft form fields.
    pub async fn form(&self) -> ScheduleForm {
        self.inner.state.read().await.form.clone()
    }

    /// Reminders armed but not yet shown.
    pub async fn pending_reminders(&self) -> Vec<ScheduledNotification> {
        self.inner.services.notifier.pending().await
    }
}

impl Inner {
    /// Start the radio and collect discoveries until `deadline`.
    ///
    /// Time spent starting the radio counts against the session.
    async fn run_session(&self, generation: u64, deadline: Instant) {
        let mut stream = match timeout_at(deadline, self.services.scanner.start_scan()).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!(error = %e, "Scan failed to start");
                self.finish_scan(generation).await;
                return;
            }
            Err(_) => {
                warn!("Scanner did not start before the session ended");
                self.finish_scan(generation).await;
                return;
            }
        };
        debug!("Radio scanning");

        let expiry = sleep_until(deadline);
        tokio::pin!(expiry);

        loop {
            tokio::select! {
                () = &mut expiry => {
                    debug!("Scan duration elapsed");
                    break;
                }
                event = stream.next() => match event {
                    Some(ScanEvent::Discovered(device)) => {
                        let mut state = self.state.write().await;
                        if !self.is_current(generation) || !state.scanning {
                            break;
                        }
                        let id = device.id.clone();
                        if push_unique_device(&mut state.devices, device) {
                            debug!(%id, "Device added");
                        }
                    }
                    Some(ScanEvent::Failed(e)) => {
                        warn!(error = %e, "Scan error");
                        break;
                    }
                    None => break,
                },
            }
        }

        self.finish_scan(generation).await;
    }

    fn is_current(&self, generation: u64) -> bool {
        self.scan_generation.load(Ordering::SeqCst) == generation
    }

    /// Stop the radio and clear the flag, unless a newer session took over.
    async fn finish_scan(&self, generation: u64) {
        if !self.is_current(generation) {
            return;
        }
        if let Err(e) = self.services.scanner.stop_scan().await {
            warn!(error = %e, "Failed to stop scan");
        }
        let mut state = self.state.write().await;
        if self.is_current(generation) && state.scanning {
            state.scanning = false;
            info!(devices = state.devices.len(), "Scan finished");
        }
    }
}
