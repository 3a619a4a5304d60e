//! Application state shared across handlers.

use std::sync::Arc;

use smrki_core::{
    AppController, BluetoothError, Config, ControllerSettings, DeviceScanner, FileStore,
    MockScanner, NotificationSink, PlatformPermissions, ScheduleStore, Services, TimerNotifier,
};
use tracing::{info, warn};

/// Handle passed to every handler.
pub type SharedState = Arc<AppState>;

/// Shared application state.
pub struct AppState {
    /// The single controller owning UI state.
    pub controller: AppController,

    /// Loaded configuration.
    pub config: Config,

    /// Whether a real Bluetooth adapter was acquired at startup.
    pub bluetooth_available: bool,
}

impl AppState {
    /// Wrap an already-built controller.
    pub fn new(controller: AppController, config: Config, bluetooth_available: bool) -> SharedState {
        Arc::new(Self {
            controller,
            config,
            bluetooth_available,
        })
    }

    /// Build the production services described by `config`.
    ///
    /// The controller is not mounted yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined.
    pub async fn from_config(config: &Config) -> anyhow::Result<SharedState> {
        let data_dir = config.storage.resolve_data_dir()?;
        info!(data_dir = %data_dir.display(), "Using data directory");

        let (scanner, bluetooth_available) = open_scanner().await;
        let services = Services {
            store: ScheduleStore::new(Arc::new(FileStore::new(data_dir))),
            notifier: Arc::new(TimerNotifier::new(notification_sink())),
            scanner,
            permissions: Arc::new(PlatformPermissions),
        };
        let controller = AppController::new(services, ControllerSettings::from(config));

        Ok(Self::new(controller, config.clone(), bluetooth_available))
    }
}

/// Stand-in used when no adapter is available. Every scan fails to start.
fn unavailable_scanner() -> Arc<dyn DeviceScanner> {
    Arc::new(MockScanner::new().refusing_start(BluetoothError::AdapterNotFound))
}

#[cfg(feature = "bluetooth")]
async fn open_scanner() -> (Arc<dyn DeviceScanner>, bool) {
    match smrki_core::BluerScanner::new().await {
        Ok(scanner) => (Arc::new(scanner), true),
        Err(e) => {
            warn!(error = %e, "Bluetooth unavailable, scanning disabled");
            (unavailable_scanner(), false)
        }
    }
}

#[cfg(not(feature = "bluetooth"))]
#[allow(clippy::unused_async)]
async fn open_scanner() -> (Arc<dyn DeviceScanner>, bool) {
    warn!("Built without the `bluetooth` feature, scanning disabled");
    (unavailable_scanner(), false)
}

#[cfg(feature = "desktop-notifications")]
fn notification_sink() -> Arc<dyn NotificationSink> {
    Arc::new(smrki_core::DesktopSink)
}

#[cfg(not(feature = "desktop-notifications"))]
fn notification_sink() -> Arc<dyn NotificationSink> {
    Arc::new(smrki_core::LogSink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_uses_configured_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.path().to_path_buf());

        let state = AppState::from_config(&config).await.unwrap();
        state.controller.mount().await;
        assert!(state.controller.schedules().await.is_empty());
        assert_eq!(state.config, config);
    }
}
