//! Operator record keeping: calibration entries, overrides, dashboards

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info};

use super::SqliteStore;
use crate::models::{AuditEntry, CalibrationStatus, EquipmentId, StatusCounts, TenantId};
use crate::status::classify_due;
use crate::store::{ComplianceRecords, EquipmentStore};
use crate::time::format_date;
use crate::{Error, Result};

#[async_trait]
impl ComplianceRecords for SqliteStore {
    async fn record_calibration(
        &self,
        equipment: EquipmentId,
        calibrated_on: NaiveDate,
        next_due: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<CalibrationStatus> {
        if next_due.is_some_and(|due| due < calibrated_on) {
            return Err(Error::InvalidInput(format!(
                "next due date precedes calibration date {calibrated_on}"
            )));
        }

        let status = classify_due(next_due, today);
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE tools
            SET last_calibration_date = ?, next_due_date = ?, calibration_status = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(format_date(calibrated_on))
        .bind(next_due.map(format_date))
        .bind(status.as_str())
        .bind(equipment)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!("equipment {equipment}")));
        }

        sqlx::query("INSERT INTO calibrations (tool_id, calibrated_on, next_due_date) VALUES (?, ?, ?)")
            .bind(equipment)
            .bind(format_date(calibrated_on))
            .bind(next_due.map(format_date))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(equipment, status = %status, "Calibration recorded");
        Ok(status)
    }

    async fn flag_overdue(&self, equipment: EquipmentId) -> Result<()> {
        self.update_status(equipment, CalibrationStatus::Overdue).await?;
        info!(equipment, "Equipment manually flagged overdue");
        Ok(())
    }

    async fn tenant_status_counts(&self, tenant: TenantId) -> Result<StatusCounts> {
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT calibration_status, COUNT(*) FROM tools
            WHERE company_id = ? AND is_active = 1
            GROUP BY calibration_status
            "#,
        )
        .bind(tenant)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.add(CalibrationStatus::from_stored(status.as_deref()), n as u32);
        }
        Ok(counts)
    }

    async fn recent_audit_entries(&self, tenant: TenantId, limit: u32) -> Result<Vec<AuditEntry>> {
        let rows: Vec<(i64, Option<String>, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT id, tier, to_address, subject, status, created_at
            FROM email_log
            WHERE company_id = ? AND direction = 'outbound'
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(tenant)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, tier, to_address, subject, status, created_at)| AuditEntry {
                id,
                tier,
                to_address,
                subject,
                status,
                created_at,
            })
            .collect())
    }
}
