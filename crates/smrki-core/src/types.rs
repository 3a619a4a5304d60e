//! Shared data model and OpenAPI schemas.
//!
//! [`Device`] is ephemeral and lives for one scan session. [`Schedule`] is
//! persisted and never mutated after creation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Display name used when a device does not advertise one.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// A Bluetooth device discovered during a scan session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "AA:BB:CC:DD:EE:FF",
    "name": "Pixel Buds"
}))]
pub struct Device {
    /// Radio address, unique within one scan session.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub id: String,

    /// Advertised name, or `"Unknown"`.
    #[schema(example = "Pixel Buds")]
    pub name: String,
}

impl Device {
    /// Builds a device, falling back to `"Unknown"` for a missing or blank name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string());
        Self {
            id: id.into(),
            name,
        }
    }
}

/// Appends `device` unless one with the same id is already listed.
///
/// The first-seen entry wins. Returns `true` when the device was added.
pub fn push_unique_device(devices: &mut Vec<Device>, device: Device) -> bool {
    if devices.iter().any(|d| d.id == device.id) {
        return false;
    }
    devices.push(device);
    true
}

/// A reminder created from the schedule form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "1736911800000",
    "title": "Take vitamins",
    "time": "09:00"
}))]
pub struct Schedule {
    /// Creation timestamp in milliseconds, as a string.
    #[schema(example = "1736911800000")]
    pub id: String,

    /// Reminder text, used as the notification message.
    #[schema(example = "Take vitamins")]
    pub title: String,

    /// Time of day in `HH:MM` form.
    #[schema(example = "09:00")]
    pub time: String,
}

/// Draft values of the schedule form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScheduleForm {
    /// Title text field.
    #[schema(example = "Take vitamins")]
    pub title: String,

    /// Time text field (`HH:MM`).
    #[schema(example = "09:00")]
    pub time: String,
}
