//! Boundary traits consumed by the enforcement scheduler
//!
//! The SQLite implementations live in [`crate::db`]; tests substitute
//! in-memory versions.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{
    AuditEntry, CalibrationStatus, Equipment, EquipmentId, NotificationEvent, StatusCounts, Tenant,
    TenantId,
};
use crate::Result;

/// Per-tenant equipment persistence
#[async_trait]
pub trait EquipmentStore: Send + Sync {
    /// Active equipment of one tenant, never another tenant's rows
    async fn list_active_equipment(&self, tenant: TenantId) -> Result<Vec<Equipment>>;

    /// Persist a recomputed status for one item (last write wins)
    async fn update_status(&self, equipment: EquipmentId, status: CalibrationStatus) -> Result<()>;
}

/// Source of tenants taking part in enforcement
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Every active tenant, onboarded or not
    ///
    /// Status classification covers all of these; only notification
    /// passes are limited to onboarded tenants.
    async fn list_active_tenants(&self) -> Result<Vec<Tenant>>;

    /// Active, onboarded tenants with their routing tables resolved
    ///
    /// A returned tenant may still lack routed tiers; callers check
    /// [`Tenant::is_enrolled`].
    async fn list_onboarded_tenants(&self) -> Result<Vec<Tenant>>;
}

/// Append-only record of outbound notification attempts
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &NotificationEvent) -> Result<()>;

    /// Whether a `sent` entry with this dedup key exists for the date
    async fn was_sent(&self, tenant: TenantId, dedup_key: &str, on: NaiveDate) -> Result<bool>;
}

/// Operator-facing record keeping beside the enforcement passes
#[async_trait]
pub trait ComplianceRecords: Send + Sync {
    /// Append a calibration and recompute the item's status against `today`
    ///
    /// The only operation that clears a sticky `Overdue`.
    async fn record_calibration(
        &self,
        equipment: EquipmentId,
        calibrated_on: NaiveDate,
        next_due: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<CalibrationStatus>;

    /// Manual overdue override
    async fn flag_overdue(&self, equipment: EquipmentId) -> Result<()>;

    /// Stored status tallies over a tenant's active equipment
    async fn tenant_status_counts(&self, tenant: TenantId) -> Result<StatusCounts>;

    /// Newest outbound audit entries for one tenant
    async fn recent_audit_entries(&self, tenant: TenantId, limit: u32) -> Result<Vec<AuditEntry>>;
}
