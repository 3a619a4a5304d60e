//! Bluetooth Low Energy device discovery.
//!
//! This module provides:
//! - The [`DeviceScanner`] contract: start an unfiltered scan, receive a
//!   stream of [`ScanEvent`]s, stop it, release the radio
//! - [`BluerScanner`], the BlueZ backend (feature `bluetooth`, Linux only)
//! - [`MockScanner`], a scripted backend for tests and hardware-less runs
//!
//! A scanner is a scoped capability. It is created once at startup, handed
//! to the controller, and released with [`DeviceScanner::destroy`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::types::Device;

/// Errors raised by scanner backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BluetoothError {
    /// No adapter is available.
    #[error("No Bluetooth adapter found")]
    AdapterNotFound,

    /// The adapter is present but powered off.
    #[error("Bluetooth adapter is powered off")]
    AdapterPoweredOff,

    /// The radio session could not be established.
    #[error("Failed to initialise Bluetooth session: {message}")]
    SessionInitFailed {
        /// Backend error text.
        message: String,
    },

    /// Discovery failed to start or broke mid-session.
    #[error("Device discovery failed: {message}")]
    DiscoveryFailed {
        /// Backend error text.
        message: String,
    },

    /// Any other backend failure.
    #[error("Bluetooth error: {message}")]
    Internal {
        /// Backend error text.
        message: String,
    },
}

/// Result alias for scanner operations.
pub type BluetoothResult<T> = std::result::Result<T, BluetoothError>;

/// One event of a scan session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A device was seen. The same device may be reported more than once.
    Discovered(Device),
    /// The session failed and will produce no further discoveries.
    Failed(BluetoothError),
}

/// Stream of events for one scan session. It ends when the scan stops.
pub type ScanStream = BoxStream<'static, ScanEvent>;

/// Radio scanning capability.
#[async_trait]
pub trait DeviceScanner: Send + Sync {
    /// Begin an unfiltered scan for all nearby LE peripherals.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter is unavailable or discovery cannot start.
    async fn start_scan(&self) -> BluetoothResult<ScanStream>;

    /// Stop the current scan, if any. Stopping an idle scanner is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the request.
    async fn stop_scan(&self) -> BluetoothResult<()>;

    /// Release the radio. Later scans fail.
    async fn destroy(&self);
}

/// Forwards a backend stream into a channel-backed [`ScanStream`].
fn channel_stream(rx: mpsc::UnboundedReceiver<ScanEvent>) -> ScanStream {
    futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|e| (e, rx)) }).boxed()
}

fn abort_task(slot: &Mutex<Option<JoinHandle<()>>>) -> bool {
    let handle = slot.lock().map(|mut guard| guard.take()).unwrap_or(None);
    handle.map_or(false, |h| {
        h.abort();
        true
    })
}

// ============================================================================
// Mock backend
// ============================================================================

/// A scripted discovery for [`MockScanner`].
#[derive(Debug, Clone)]
pub struct MockDevice {
    /// Radio address reported.
    pub id: String,
    /// Advertised name, if any.
    pub name: Option<String>,
    /// Delay after scan start before the discovery is reported.
    pub after: Duration,
}

impl MockDevice {
    /// A nameless device reported immediately.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            after: Duration::ZERO,
        }
    }

    /// Set the advertised name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Report the device `delay` after the scan starts.
    #[must_use]
    pub const fn after(mut self, delay: Duration) -> Self {
        self.after = delay;
        self
    }
}

/// Scanner that replays a fixed script.
///
/// After the script is exhausted the session stays open until stopped, like
/// a real radio with nothing new in range.
#[derive(Debug, Default)]
pub struct MockScanner {
    devices: Vec<MockDevice>,
    failure: Option<(Duration, BluetoothError)>,
    start_error: Option<BluetoothError>,
    task: Mutex<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
    scans_started: AtomicUsize,
    stops: AtomicUsize,
}

impl MockScanner {
    /// A scanner that discovers nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scripted discovery.
    #[must_use]
    pub fn with_device(mut self, device: MockDevice) -> Self {
        self.devices.push(device);
        self
    }

    /// Fail the session `after` the scan starts.
    #[must_use]
    pub fn failing_after(mut self, after: Duration, error: BluetoothError) -> Self {
        self.failure = Some((after, error));
        self
    }

    /// Make `start_scan` itself fail.
    #[must_use]
    pub fn refusing_start(mut self, error: BluetoothError) -> Self {
        self.start_error = Some(error);
        self
    }

    /// Number of sessions started so far.
    pub fn scans_started(&self) -> usize {
        self.scans_started.load(Ordering::SeqCst)
    }

    /// Number of `stop_scan` calls that stopped a running session.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Whether `destroy` has been called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceScanner for MockScanner {
    async fn start_scan(&self) -> BluetoothResult<ScanStream> {
        if self.is_destroyed() {
            return Err(BluetoothError::Internal {
                message: "scanner has been destroyed".into(),
            });
        }
        if let Some(err) = &self.start_error {
            return Err(err.clone());
        }

        let mut script: Vec<(Duration, ScanEvent)> = self
            .devices
            .iter()
            .map(|d| {
                (
                    d.after,
                    ScanEvent::Discovered(Device::new(d.id.clone(), d.name.clone())),
                )
            })
            .collect();
        if let Some((after, err)) = &self.failure {
            script.push((*after, ScanEvent::Failed(err.clone())));
        }
        script.sort_by_key(|(after, _)| *after);

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            for (after, event) in script {
                tokio::time::sleep_until(started + after).await;
                let failed = matches!(event, ScanEvent::Failed(_));
                if tx.send(event).is_err() || failed {
                    return;
                }
            }
            // Hold the sender so the session stays open until stopped.
            std::future::pending::<()>().await;
        });

        abort_task(&self.task);
        if let Ok(mut guard) = self.task.lock() {
            *guard = Some(handle);
        }
        self.scans_started.fetch_add(1, Ordering::SeqCst);
        Ok(channel_stream(rx))
    }

    async fn stop_scan(&self) -> BluetoothResult<()> {
        if abort_task(&self.task) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn destroy(&self) {
        abort_task(&self.task);
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// BlueZ backend
// ============================================================================

#[cfg(feature = "bluetooth")]
pub use bluez::BluerScanner;

#[cfg(feature = "bluetooth")]
mod bluez {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bluer::{AdapterEvent, DiscoveryFilter, DiscoveryTransport};
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tracing::{debug, info};

    use super::{
        abort_task, channel_stream, BluetoothError, BluetoothResult, DeviceScanner, ScanEvent,
        ScanStream,
    };
    use crate::types::Device;

    /// Scanner backed by BlueZ through `bluer`.
    pub struct BluerScanner {
        _session: bluer::Session,
        adapter: bluer::Adapter,
        task: Mutex<Option<JoinHandle<()>>>,
        destroyed: AtomicBool,
    }

    impl BluerScanner {
        /// Open a BlueZ session on the default adapter.
        ///
        /// # Errors
        ///
        /// Returns an error if BlueZ is unreachable or no adapter exists.
        pub async fn new() -> BluetoothResult<Self> {
            let session = bluer::Session::new()
                .await
                .map_err(|e| BluetoothError::SessionInitFailed {
                    message: e.to_string(),
                })?;
            let adapter = session
                .default_adapter()
                .await
                .map_err(|_| BluetoothError::AdapterNotFound)?;
            info!(adapter = adapter.name(), "Bluetooth adapter acquired");

            Ok(Self {
                _session: session,
                adapter,
                task: Mutex::new(None),
                destroyed: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl DeviceScanner for BluerScanner {
        async fn start_scan(&self) -> BluetoothResult<ScanStream> {
            if self.destroyed.load(Ordering::SeqCst) {
                return Err(BluetoothError::Internal {
                    message: "Bluetooth session has been released".into(),
                });
            }

            let powered = self
                .adapter
                .is_powered()
                .await
                .map_err(|e| BluetoothError::Internal {
                    message: e.to_string(),
                })?;
            if !powered {
                return Err(BluetoothError::AdapterPoweredOff);
            }

            let filter = DiscoveryFilter {
                transport: DiscoveryTransport::Le,
                ..DiscoveryFilter::default()
            };
            self.adapter
                .set_discovery_filter(filter)
                .await
                .map_err(|e| BluetoothError::DiscoveryFailed {
                    message: e.to_string(),
                })?;
            let events = self.adapter.discover_devices().await.map_err(|e| {
                BluetoothError::DiscoveryFailed {
                    message: e.to_string(),
                }
            })?;

            let adapter = self.adapter.clone();
            let (tx, rx) = mpsc::unbounded_channel();
            let handle = tokio::spawn(async move {
                futures::pin_mut!(events);
                while let Some(event) = events.next().await {
                    let AdapterEvent::DeviceAdded(addr) = event else {
                        continue;
                    };
                    let event = match adapter.device(addr) {
                        Ok(device) => {
                            let name = device.name().await.ok().flatten();
                            debug!(address = %addr, ?name, "Device discovered");
                            ScanEvent::Discovered(Device::new(addr.to_string(), name))
                        }
                        Err(e) => ScanEvent::Failed(BluetoothError::DiscoveryFailed {
                            message: e.to_string(),
                        }),
                    };
                    let failed = matches!(event, ScanEvent::Failed(_));
                    if tx.send(event).is_err() || failed {
                        break;
                    }
                }
            });

            abort_task(&self.task);
            if let Ok(mut guard) = self.task.lock() {
                *guard = Some(handle);
            }
            Ok(channel_stream(rx))
        }

        async fn stop_scan(&self) -> BluetoothResult<()> {
            // Dropping the discovery stream ends discovery on the adapter.
            abort_task(&self.task);
            Ok(())
        }

        async fn destroy(&self) {
            self.destroyed.store(true, Ordering::SeqCst);
            abort_task(&self.task);
            info!("Bluetooth session released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_mock_replays_script_in_time_order() {
        let scanner = MockScanner::new()
            .with_device(MockDevice::new("BB").after(Duration::from_secs(2)))
            .with_device(MockDevice::new("AA").named("Watch"));

        let mut stream = scanner.start_scan().await.unwrap();
        assert_eq!(
            stream.next().await,
            Some(ScanEvent::Discovered(Device::new("AA", Some("Watch".into()))))
        );
        assert_eq!(
            stream.next().await,
            Some(ScanEvent::Discovered(Device::new("BB", None)))
        );
        assert_eq!(scanner.scans_started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_stream() {
        let scanner = MockScanner::new();
        let mut stream = scanner.start_scan().await.unwrap();

        scanner.stop_scan().await.unwrap();
        assert_eq!(stream.next().await, None);
        assert_eq!(scanner.stops(), 1);

        // Idle stop does not count.
        scanner.stop_scan().await.unwrap();
        assert_eq!(scanner.stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_terminates_session() {
        let err = BluetoothError::DiscoveryFailed {
            message: "radio reset".into(),
        };
        let scanner = MockScanner::new()
            .with_device(MockDevice::new("AA").after(Duration::from_secs(5)))
            .failing_after(Duration::from_secs(1), err.clone());

        let mut stream = scanner.start_scan().await.unwrap();
        assert_eq!(stream.next().await, Some(ScanEvent::Failed(err)));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_destroyed_scanner_refuses_scans() {
        let scanner = MockScanner::new();
        scanner.destroy().await;
        assert!(scanner.is_destroyed());
        assert!(scanner.start_scan().await.is_err());
    }

    #[tokio::test]
    async fn test_refusing_start() {
        let scanner = MockScanner::new().refusing_start(BluetoothError::AdapterPoweredOff);
        assert_eq!(
            scanner.start_scan().await.err(),
            Some(BluetoothError::AdapterPoweredOff)
        );
    }

    #[cfg(feature = "bluetooth")]
    #[tokio::test]
    #[ignore = "needs a BlueZ adapter"]
    async fn test_released_bluez_session_refuses_scans() {
        let scanner = BluerScanner::new().await.unwrap();
        scanner.destroy().await;
        assert!(matches!(
            scanner.start_scan().await,
            Err(BluetoothError::Internal { .. })
        ));
    }
}
