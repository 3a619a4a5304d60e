//! Runtime permission checks made before scanning.
//!
//! Scanning needs three permissions, requested together as one batch.
//! Whether a partially granted batch is good enough is decided by the
//! configured [`PermissionPolicy`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SmrkiError};

/// A runtime permission the scanner depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Discover nearby devices.
    BluetoothScan,
    /// Talk to discovered devices.
    BluetoothConnect,
    /// Precise location, required for BLE scans on some platforms.
    AccessFineLocation,
}

/// The batch requested before every scan.
pub const SCAN_PERMISSIONS: [Permission; 3] = [
    Permission::BluetoothScan,
    Permission::BluetoothConnect,
    Permission::AccessFineLocation,
];

/// Per-permission outcome of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionReport {
    outcomes: HashMap<Permission, bool>,
}

impl PermissionReport {
    /// Report with every listed permission granted.
    #[must_use]
    pub fn all_granted(permissions: &[Permission]) -> Self {
        Self {
            outcomes: permissions.iter().map(|p| (*p, true)).collect(),
        }
    }

    /// Record an outcome.
    #[must_use]
    pub fn with(mut self, permission: Permission, granted: bool) -> Self {
        self.outcomes.insert(permission, granted);
        self
    }

    /// Requested permissions that were not granted (missing counts as denied).
    #[must_use]
    pub fn denied(&self, requested: &[Permission]) -> Vec<Permission> {
        requested
            .iter()
            .filter(|p| !self.outcomes.get(p).copied().unwrap_or(false))
            .copied()
            .collect()
    }
}

/// How a permission report is judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionPolicy {
    /// Every requested permission must be granted.
    #[default]
    Strict,
    /// Only the request call itself has to succeed.
    Lenient,
}

/// Platform permission prompt.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Ask for `permissions` as one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the request itself fails.
    async fn request(&self, permissions: &[Permission]) -> Result<PermissionReport>;
}

/// Permissions on desktop platforms, where no runtime prompt exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformPermissions;

#[async_trait]
impl PermissionGate for PlatformPermissions {
    async fn request(&self, permissions: &[Permission]) -> Result<PermissionReport> {
        Ok(PermissionReport::all_granted(permissions))
    }
}

/// Fixed answers, for tests.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    report: PermissionReport,
    fail: bool,
}

#[cfg(any(test, feature = "testing"))]
impl StaticPermissions {
    /// Answer every request with `report`.
    #[must_use]
    pub const fn new(report: PermissionReport) -> Self {
        Self {
            report,
            fail: false,
        }
    }

    /// Make the request call itself fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            report: PermissionReport::default(),
            fail: true,
        }
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl PermissionGate for StaticPermissions {
    async fn request(&self, _permissions: &[Permission]) -> Result<PermissionReport> {
        if self.fail {
            return Err(SmrkiError::PermissionDenied(
                "permission request failed".into(),
            ));
        }
        Ok(self.report.clone())
    }
}

/// Request the scan batch and apply `policy`.
///
/// # Errors
///
/// Returns [`SmrkiError::PermissionDenied`] when the request fails, or when
/// `policy` is strict and any permission was refused.
pub async fn ensure_scan_permissions(
    gate: &dyn PermissionGate,
    policy: PermissionPolicy,
) -> Result<()> {
    let report = gate.request(&SCAN_PERMISSIONS).await.map_err(|e| {
        warn!(error = %e, "Permission request failed");
        SmrkiError::PermissionDenied(e.to_string())
    })?;

    let denied = report.denied(&SCAN_PERMISSIONS);
    if denied.is_empty() {
        return Ok(());
    }
    match policy {
        PermissionPolicy::Strict => Err(SmrkiError::PermissionDenied(format!("{denied:?}"))),
        PermissionPolicy::Lenient => {
            warn!(?denied, "Continuing scan without all permissions");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial() -> PermissionReport {
        PermissionReport::all_granted(&SCAN_PERMISSIONS).with(Permission::AccessFineLocation, false)
    }

    #[tokio::test]
    async fn test_platform_grants_everything() {
        assert!(
            ensure_scan_permissions(&PlatformPermissions, PermissionPolicy::Strict)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_strict_rejects_partial_grant() {
        let gate = StaticPermissions::new(partial());
        let err = ensure_scan_permissions(&gate, PermissionPolicy::Strict)
            .await
            .unwrap_err();
        assert!(matches!(err, SmrkiError::PermissionDenied(ref m) if m.contains("AccessFineLocation")));
    }

    #[tokio::test]
    async fn test_lenient_accepts_partial_grant() {
        let gate = StaticPermissions::new(partial());
        assert!(ensure_scan_permissions(&gate, PermissionPolicy::Lenient)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_failed_request_denies_under_any_policy() {
        for policy in [PermissionPolicy::Strict, PermissionPolicy::Lenient] {
            let result = ensure_scan_permissions(&StaticPermissions::failing(), policy).await;
            assert!(matches!(result, Err(SmrkiError::PermissionDenied(_))));
        }
    }

    #[test]
    fn test_missing_outcome_counts_as_denied() {
        let report = PermissionReport::default().with(Permission::BluetoothScan, true);
        assert_eq!(
            report.denied(&SCAN_PERMISSIONS),
            vec![Permission::BluetoothConnect, Permission::AccessFineLocation]
        );
    }
}
