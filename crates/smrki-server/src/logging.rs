//! Logging initialization.
//!
//! - **Production**: JSON logs to daily rolling files plus compact stdout
//! - **Development**: pretty stdout with span open/close events
//!
//! The filter comes from `RUST_LOG`, then `SMRKI_LOG_LEVEL`, then `info`.

use std::path::PathBuf;
use std::sync::OnceLock;

use smrki_core::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Writer guards. Dropping one loses buffered lines, so they live forever.
static GUARDS: OnceLock<[WorkerGuard; 2]> = OnceLock::new();

const LOG_FILE_PREFIX: &str = "smrki";

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Returns an error if the filter cannot be parsed or the log directory
/// cannot be created.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = env_filter()?;

    if config.production {
        let dir = config.directory.clone().unwrap_or_else(log_directory);
        init_production(env_filter, dir)
    } else {
        init_development(env_filter);
        Ok(())
    }
}

fn env_filter() -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = std::env::var("SMRKI_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    Ok(EnvFilter::try_new(level)?)
}

fn init_production(env_filter: EnvFilter, log_dir: PathBuf) -> anyhow::Result<()> {
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // journald adds its own timestamps and does not render ANSI
    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    let _ = GUARDS.set([file_guard, stdout_guard]);
    tracing::info!(dir = %log_dir.display(), "File logging enabled");
    Ok(())
}

fn init_development(env_filter: EnvFilter) {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();
}

/// Default log directory for the current platform.
fn log_directory() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/log/smrki")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "smrki")
            .map(|dirs| dirs.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("./logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_is_valid_path() {
        assert!(!log_directory().as_os_str().is_empty());
    }

    #[test]
    fn test_env_filter_parses_default() {
        assert!(env_filter().is_ok());
    }
}
