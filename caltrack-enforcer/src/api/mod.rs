//! HTTP handlers for the enforcer

pub mod auth;
pub mod health;
pub mod records;
pub mod trigger;

pub use auth::{auth_middleware, TRIGGER_SECRET_HEADER};
pub use health::health_routes;
pub use records::{audit_entries, flag_overdue, record_calibration, status_counts};
pub use trigger::{run_enforcement, run_refresh, run_weekly_summary};
