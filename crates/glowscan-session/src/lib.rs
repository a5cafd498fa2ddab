//! glowscan-session — Scan lifecycle and shared application state.
//!
//! Drives a scan from permission request to completed analysis on a single
//! tokio task, and publishes every change through a watch-backed store.

pub mod config;
pub mod controller;
pub mod state;
pub mod store;

pub use config::{Config, ConfigError};
pub use controller::{spawn_session, ScanError, ScanHandle, SessionError};
pub use state::{progress_message, ScanEvent, ScanStatus};
pub use store::{AppState, ScanProgress, Store};
