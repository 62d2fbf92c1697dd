//! Compliance record endpoints
//!
//! Operator-facing reads and writes against tenant equipment: log a
//! calibration, force an item overdue, and read status tallies and the
//! outbound audit trail. All sit behind the trigger secret.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use caltrack_common::models::{AuditEntry, CalibrationStatus, EquipmentId, StatusCounts, TenantId};

use crate::error::ApiResult;
use crate::AppState;

const MAX_AUDIT_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// Body of POST /api/equipment/:id/calibration
#[derive(Debug, Deserialize)]
pub struct CalibrationRequest {
    pub calibrated_on: NaiveDate,
    pub next_due: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub equipment_id: EquipmentId,
    pub status: CalibrationStatus,
}

/// GET /api/tenants/:id/status-counts
pub async fn status_counts(
    State(state): State<AppState>,
    Path(tenant): Path<TenantId>,
) -> ApiResult<Json<StatusCounts>> {
    let counts = state.records.tenant_status_counts(tenant).await?;
    Ok(Json(counts))
}

/// GET /api/tenants/:id/audit?limit=N
///
/// Newest first; `limit` defaults to 50 and is capped at 500.
pub async fn audit_entries(
    State(state): State<AppState>,
    Path(tenant): Path<TenantId>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    let limit = query.limit.min(MAX_AUDIT_LIMIT);
    let entries = state.records.recent_audit_entries(tenant, limit).await?;
    Ok(Json(entries))
}

/// POST /api/equipment/:id/calibration
///
/// Status is recomputed against the enforcer's clock so it agrees with
/// the next refresh sweep.
pub async fn record_calibration(
    State(state): State<AppState>,
    Path(equipment): Path<EquipmentId>,
    Json(request): Json<CalibrationRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let today = state.enforcer.clock().today();
    let status = state
        .records
        .record_calibration(equipment, request.calibrated_on, request.next_due, today)
        .await?;

    info!(equipment, status = %status, "Calibration recorded");
    Ok(Json(StatusResponse {
        equipment_id: equipment,
        status,
    }))
}

/// POST /api/equipment/:id/flag-overdue
pub async fn flag_overdue(
    State(state): State<AppState>,
    Path(equipment): Path<EquipmentId>,
) -> ApiResult<Json<StatusResponse>> {
    state.records.flag_overdue(equipment).await?;
    Ok(Json(StatusResponse {
        equipment_id: equipment,
        status: CalibrationStatus::Overdue,
    }))
}
