//! Manual trigger endpoints
//!
//! Each runs one pass synchronously and returns its [`EnforcementRun`].
//! A pass already in progress (scheduled or manual) answers 409.

use axum::{extract::State, Json};
use tracing::info;

use crate::enforce::{EnforcementRun, JobKind};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

async fn trigger(state: &AppState, job: JobKind) -> ApiResult<Json<EnforcementRun>> {
    info!(job = %job, "Manual trigger received");
    state
        .enforcer
        .try_run_job(job)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::Conflict(format!("cannot start {job}: a pass is already running")))
}

/// POST /api/enforcement/run
pub async fn run_enforcement(State(state): State<AppState>) -> ApiResult<Json<EnforcementRun>> {
    trigger(&state, JobKind::DailyEnforcement).await
}

/// POST /api/enforcement/weekly-summary
pub async fn run_weekly_summary(State(state): State<AppState>) -> ApiResult<Json<EnforcementRun>> {
    trigger(&state, JobKind::WeeklySummary).await
}

/// POST /api/enforcement/refresh
pub async fn run_refresh(State(state): State<AppState>) -> ApiResult<Json<EnforcementRun>> {
    trigger(&state, JobKind::StatusRefresh).await
}
