//! # smrki-server
//!
//! HTTP server library for smrki: nearby Bluetooth device scanning and
//! one-shot reminder scheduling.
//!
//! The binary in `main.rs` wires these pieces together; tests build the
//! router directly with in-memory services.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
