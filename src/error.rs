//! Crate-wide error type.
//!
//! Startup errors (`IpcExport`, `AdapterNotFound`, and `IpcCall` during
//! registration) are fatal: `main` logs them and exits with code 1.
//! Every other variant is recovered locally by the call site that
//! produces it and never propagates past the dispatcher entry point.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to export object on the bus: {0}")]
    IpcExport(String),

    #[error("no adapter with GATT-manager and LE-advertising support was found")]
    AdapterNotFound,

    #[error("D-Bus call failed: {0}")]
    IpcCall(#[from] dbus::Error),

    #[error("a scan is already in progress")]
    ScanBusy,

    #[error("connection activation was rejected: {0}")]
    ConnectRejected(String),

    #[error("command payload was empty or had no recognizable op")]
    ParseEmpty,
}
