//! # smrki-core
//!
//! Core logic for smrki, a small daily helper that scans for nearby
//! Bluetooth Low Energy devices and arms one-shot reminder notifications.
//!
//! This crate provides:
//! - Bluetooth device discovery behind a scanner capability
//! - Schedule creation, persistence and reminder time resolution
//! - Local notification scheduling
//! - The application controller tying them together
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`bluetooth`] - Scanner contract, BlueZ backend and scripted mock
//! - [`config`] - Layered configuration loading and validation
//! - [`controller`] - UI state and orchestration of the leaf services
//! - [`error`] - Unified error types for the crate
//! - [`notifications`] - One-shot reminder scheduling
//! - [`permissions`] - Runtime permission checks before scanning
//! - [`schedule`] - Form validation, ids and time-of-day resolution
//! - [`storage`] - Key-value persistence of the schedule list
//! - [`types`] - Shared data model and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod bluetooth;
pub mod config;
pub mod controller;
pub mod error;
pub mod notifications;
pub mod permissions;
pub mod schedule;
pub mod storage;
pub mod types;

// Re-export primary types for convenience
#[cfg(feature = "bluetooth")]
pub use bluetooth::BluerScanner;
pub use bluetooth::{
    BluetoothError, BluetoothResult, DeviceScanner, MockDevice, MockScanner, ScanEvent,
    ScanStream,
};
pub use config::{default_config_path, Config};
pub use controller::{AddedSchedule, AppController, ControllerSettings, ControllerState, Services};
pub use error::{Result, SmrkiError};
#[cfg(feature = "desktop-notifications")]
pub use notifications::DesktopSink;
pub use notifications::{
    LogSink, NotificationScheduler, NotificationSink, ScheduledNotification, TimerNotifier,
};
pub use permissions::{
    Permission, PermissionGate, PermissionPolicy, PermissionReport, PlatformPermissions,
};

// Test doubles
#[cfg(feature = "testing")]
pub use notifications::RecordingNotifier;
#[cfg(feature = "testing")]
pub use permissions::StaticPermissions;
pub use schedule::resolve_fire_time;
pub use storage::{default_data_dir, FileStore, KeyValueStore, MemoryStore, ScheduleStore};
pub use types::{Device, Schedule, ScheduleForm};
