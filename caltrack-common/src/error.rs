//! Error types shared by the CalTrack crates
//!
//! Per-tenant and per-item failures inside an enforcement pass are logged
//! and counted, never surfaced through this type. `Error` covers the
//! failures a caller can act on: storage, configuration and lookups.

use thiserror::Error;

/// Result alias used throughout the CalTrack crates
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// SQLite read/write failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed `caltrack.toml`
    #[error("Config file parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration present but invalid (bad time, ordering violation, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Equipment or tenant id did not match a row
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
