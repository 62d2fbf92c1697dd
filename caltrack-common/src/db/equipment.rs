//! Equipment queries on the `tools` and `calibrations` tables

use async_trait::async_trait;
use chrono::NaiveDate;

use super::SqliteStore;
use crate::models::{CalibrationMethod, CalibrationStatus, Equipment, EquipmentId, TenantId};
use crate::store::EquipmentStore;
use crate::time::{format_date, parse_date};
use crate::{Error, Result};

const EQUIPMENT_COLUMNS: &str = "id, company_id, number, description, type AS category, \
     calibration_method, calibrated_by, is_active, last_calibration_date, next_due_date, \
     calibration_status";

#[derive(Debug, sqlx::FromRow)]
struct EquipmentRow {
    id: i64,
    company_id: i64,
    number: String,
    description: String,
    category: String,
    calibration_method: String,
    calibrated_by: String,
    is_active: bool,
    last_calibration_date: Option<String>,
    next_due_date: Option<String>,
    calibration_status: Option<String>,
}

impl From<EquipmentRow> for Equipment {
    fn from(row: EquipmentRow) -> Self {
        Equipment {
            id: row.id,
            tenant_id: row.company_id,
            identifier: row.number,
            name: row.description,
            category: row.category,
            method: CalibrationMethod::from_stored(&row.calibration_method),
            calibrated_by: row.calibrated_by,
            active: row.is_active,
            last_calibrated: row.last_calibration_date.as_deref().and_then(parse_date),
            next_due: row.next_due_date.as_deref().and_then(parse_date),
            status: CalibrationStatus::from_stored(row.calibration_status.as_deref()),
        }
    }
}

/// Registry insert. Registry management proper lives outside this service;
/// this exists for seeding and imports.
#[derive(Debug, Clone, Default)]
pub struct NewEquipment {
    pub tenant_id: TenantId,
    pub identifier: String,
    pub name: String,
    pub category: String,
    pub method: CalibrationMethod,
    pub calibrated_by: String,
    pub active: bool,
    pub last_calibrated: Option<NaiveDate>,
    /// Raw due-date text, stored verbatim
    pub next_due: Option<String>,
    pub status: Option<CalibrationStatus>,
}

#[async_trait]
impl EquipmentStore for SqliteStore {
    async fn list_active_equipment(&self, tenant: TenantId) -> Result<Vec<Equipment>> {
        let sql = format!(
            "SELECT {EQUIPMENT_COLUMNS} FROM tools WHERE company_id = ? AND is_active = 1 ORDER BY number"
        );
        let rows = sqlx::query_as::<_, EquipmentRow>(&sql)
            .bind(tenant)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Equipment::from).collect())
    }

    async fn update_status(&self, equipment: EquipmentId, status: CalibrationStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE tools SET calibration_status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(equipment)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("equipment {equipment}")));
        }
        Ok(())
    }
}

impl SqliteStore {
    pub async fn insert_equipment(&self, new: &NewEquipment) -> Result<EquipmentId> {
        let result = sqlx::query(
            r#"
            INSERT INTO tools
            (company_id, number, description, type, calibration_method, calibrated_by,
             is_active, last_calibration_date, next_due_date, calibration_status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.tenant_id)
        .bind(&new.identifier)
        .bind(&new.name)
        .bind(&new.category)
        .bind(new.method.as_str())
        .bind(&new.calibrated_by)
        .bind(new.active)
        .bind(new.last_calibrated.map(format_date))
        .bind(new.next_due.as_deref())
        .bind(new.status.map(|s| s.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_equipment(&self, equipment: EquipmentId) -> Result<Equipment> {
        let sql = format!("SELECT {EQUIPMENT_COLUMNS} FROM tools WHERE id = ?");
        sqlx::query_as::<_, EquipmentRow>(&sql)
            .bind(equipment)
            .fetch_optional(&self.pool)
            .await?
            .map(Equipment::from)
            .ok_or_else(|| Error::NotFound(format!("equipment {equipment}")))
    }
}
