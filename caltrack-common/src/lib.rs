//! # CalTrack Common Library
//!
//! Shared code for the CalTrack calibration-compliance services:
//! - Equipment, tenant and notification models
//! - Calibration status classification
//! - Boundary traits for the equipment store, tenant directory and audit log
//! - SQLite implementations of those traits
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod status;
pub mod store;
pub mod time;

pub use error::{Error, Result};
pub use models::{CalibrationStatus, Equipment, Tenant, Tier};
