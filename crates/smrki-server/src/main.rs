//! # smrki-server
//!
//! HTTP server for smrki.
//!
//! ## Running
//!
//! ```bash
//! # Development, no radio
//! cargo run --package smrki-server
//!
//! # With BlueZ scanning and desktop notifications
//! cargo run --package smrki-server --features bluetooth,desktop-notifications
//! ```
//!
//! Configuration is read from `SMRKI_CONFIG` if set, otherwise from the
//! per-user config directory. `SMRKI__SECTION__KEY` variables override it.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;

use anyhow::Context;
use smrki_core::{default_config_path, Config};
use smrki_server::api::create_router;
use smrki_server::logging;
use smrki_server::state::AppState;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os("SMRKI_CONFIG")
        .map(PathBuf::from)
        .or_else(default_config_path);
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;

    logging::init(&config.logging)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?config_path,
        "Starting smrki-server"
    );

    let state = AppState::from_config(&config).await?;
    state.controller.mount().await;

    let app = create_router(state.clone());

    let addr = config.bind_address()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.controller.unmount().await;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
