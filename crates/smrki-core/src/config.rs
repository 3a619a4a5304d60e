//! Application configuration management.
//!
//! Configuration is layered with the `config` crate:
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. `SMRKI__`-prefixed environment variables, e.g.
//!    `SMRKI__SCAN__DURATION_SECS=5`

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SmrkiError};
use crate::permissions::PermissionPolicy;

/// Default length of a scan session.
pub const DEFAULT_SCAN_DURATION_SECS: u64 = 8;

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Scan session settings.
    pub scan: ScanConfig,

    /// Permission handling.
    pub permissions: PermissionsConfig,

    /// Where schedules are persisted.
    pub storage: StorageConfig,

    /// Log output settings.
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

/// Scan session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Seconds a scan runs before it is stopped.
    pub duration_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_SCAN_DURATION_SECS,
        }
    }
}

impl ScanConfig {
    /// Scan length as a [`Duration`].
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Permission handling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Whether every scan permission must be granted.
    pub policy: PermissionPolicy,
}

/// Where schedules are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured data directory, or the platform default.
    ///
    /// # Errors
    ///
    /// Returns an error if no default directory can be determined.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::storage::default_data_dir(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// JSON file logs plus compact stdout instead of pretty stdout.
    pub production: bool,

    /// Where production log files go. Defaults per platform.
    pub directory: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("SMRKI")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| SmrkiError::ConfigParseError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SmrkiError::ConfigValidationError`] describing the first
    /// invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.scan.duration_secs == 0 {
            return Err(SmrkiError::ConfigValidationError(
                "scan.duration_secs must be greater than zero".into(),
            ));
        }
        self.server.bind_address.parse::<SocketAddr>().map_err(|e| {
            SmrkiError::ConfigValidationError(format!(
                "server.bind_address '{}' is not a socket address: {e}",
                self.server.bind_address
            ))
        })?;
        Ok(())
    }

    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not parse.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server
            .bind_address
            .parse()
            .map_err(|e| SmrkiError::ConfigValidationError(format!("server.bind_address: {e}")))
    }
}

/// Get the default configuration file path, e.g. `~/.config/smrki/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "smrki").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scan.duration(), Duration::from_secs(8));
        assert_eq!(config.permissions.policy, PermissionPolicy::Strict);
        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.scan.duration_secs, DEFAULT_SCAN_DURATION_SECS);
    }

    #[test]
    fn test_partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[scan]\nduration_secs = 3\n\n[permissions]\npolicy = \"lenient\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.scan.duration_secs, 3);
        assert_eq!(config.permissions.policy, PermissionPolicy::Lenient);
        assert_eq!(config.server.bind_address, DEFAULT_BIND_ADDRESS);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.path().join("data"));
        config.logging.production = true;

        config.save(&path).unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_zero_duration() {
        let mut config = Config::default();
        config.scan.duration_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(SmrkiError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_bind_address() {
        let mut config = Config::default();
        config.server.bind_address = "localhost".into();
        assert!(matches!(
            config.validate(),
            Err(SmrkiError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let storage = StorageConfig {
            data_dir: Some(PathBuf::from("/tmp/smrki-test")),
        };
        assert_eq!(
            storage.resolve_data_dir().unwrap(),
            PathBuf::from("/tmp/smrki-test")
        );
    }
}
