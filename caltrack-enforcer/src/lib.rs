//! caltrack-enforcer library - calibration compliance enforcement
//!
//! Scheduled and manually triggered passes that keep equipment calibration
//! statuses current and escalate upcoming and overdue calibrations to each
//! tenant's configured recipients.

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod compose;
pub mod delivery;
pub mod enforce;
pub mod error;
pub mod schedule;

use caltrack_common::store::ComplianceRecords;
use enforce::Enforcer;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub enforcer: Arc<Enforcer>,
    pub records: Arc<dyn ComplianceRecords>,
    /// `None` refuses every protected route
    pub trigger_secret: Option<String>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        enforcer: Arc<Enforcer>,
        records: Arc<dyn ComplianceRecords>,
        trigger_secret: Option<String>,
    ) -> Self {
        Self {
            enforcer,
            records,
            trigger_secret,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Trigger and record routes sit behind the shared-secret middleware;
/// `/health` does not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/api/enforcement/run", post(api::run_enforcement))
        .route("/api/enforcement/weekly-summary", post(api::run_weekly_summary))
        .route("/api/enforcement/refresh", post(api::run_refresh))
        .route("/api/tenants/:id/status-counts", get(api::status_counts))
        .route("/api/tenants/:id/audit", get(api::audit_entries))
        .route("/api/equipment/:id/calibration", post(api::record_calibration))
        .route("/api/equipment/:id/flag-overdue", post(api::flag_overdue))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new().merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
