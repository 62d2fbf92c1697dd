//! Domain models: equipment, tenants, notification tiers and audit events

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Row id of a `tools` record
pub type EquipmentId = i64;

/// Row id of a `companies` record
pub type TenantId = i64;

// ========================================
// Calibration status
// ========================================

/// Calibration status of one piece of equipment
///
/// Severity order is `Current < ExpiringSoon < Critical < Overdue`.
/// `Unknown` (no usable due date) sorts below all of them and never
/// escalates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    Unknown,
    Current,
    ExpiringSoon,
    Critical,
    Overdue,
}

impl CalibrationStatus {
    pub const ALL: [CalibrationStatus; 5] = [
        CalibrationStatus::Current,
        CalibrationStatus::ExpiringSoon,
        CalibrationStatus::Critical,
        CalibrationStatus::Overdue,
        CalibrationStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationStatus::Unknown => "unknown",
            CalibrationStatus::Current => "current",
            CalibrationStatus::ExpiringSoon => "expiring_soon",
            CalibrationStatus::Critical => "critical",
            CalibrationStatus::Overdue => "overdue",
        }
    }

    /// Interpret a stored `calibration_status` column
    ///
    /// NULL and values written by older tooling (e.g. "active") map to
    /// `Unknown`, so the next sweep overwrites them with a computed status.
    pub fn from_stored(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(CalibrationStatus::Unknown)
    }
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalibrationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(CalibrationStatus::Unknown),
            "current" => Ok(CalibrationStatus::Current),
            "expiring_soon" | "expiring" => Ok(CalibrationStatus::ExpiringSoon),
            "critical" => Ok(CalibrationStatus::Critical),
            "overdue" => Ok(CalibrationStatus::Overdue),
            other => Err(Error::InvalidInput(format!("unknown calibration status: {other}"))),
        }
    }
}

// ========================================
// Equipment
// ========================================

/// Who performs the calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMethod {
    #[default]
    InHouse,
    Vendor,
}

impl CalibrationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationMethod::InHouse => "in_house",
            CalibrationMethod::Vendor => "vendor",
        }
    }

    /// Lenient parse of the `calibration_method` column; anything that is
    /// not recognisably external is treated as in-house.
    pub fn from_stored(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "vendor" | "external" | "outside" | "outsourced" => CalibrationMethod::Vendor,
            _ => CalibrationMethod::InHouse,
        }
    }
}

/// One physical instrument under calibration management
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: EquipmentId,
    pub tenant_id: TenantId,
    /// Tenant-scoped asset tag, e.g. "CAL-0042"
    pub identifier: String,
    pub name: String,
    pub category: String,
    pub method: CalibrationMethod,
    /// Lab or vendor performing the calibration
    pub calibrated_by: String,
    pub active: bool,
    pub last_calibrated: Option<NaiveDate>,
    /// `None` when absent or unparseable
    pub next_due: Option<NaiveDate>,
    pub status: CalibrationStatus,
}

/// Per-status tallies for one tenant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub current: u32,
    pub expiring_soon: u32,
    pub critical: u32,
    pub overdue: u32,
    pub unknown: u32,
}

impl StatusCounts {
    pub fn add(&mut self, status: CalibrationStatus, n: u32) {
        match status {
            CalibrationStatus::Current => self.current += n,
            CalibrationStatus::ExpiringSoon => self.expiring_soon += n,
            CalibrationStatus::Critical => self.critical += n,
            CalibrationStatus::Overdue => self.overdue += n,
            CalibrationStatus::Unknown => self.unknown += n,
        }
    }

    pub fn get(&self, status: CalibrationStatus) -> u32 {
        match status {
            CalibrationStatus::Current => self.current,
            CalibrationStatus::ExpiringSoon => self.expiring_soon,
            CalibrationStatus::Critical => self.critical,
            CalibrationStatus::Overdue => self.overdue,
            CalibrationStatus::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> u32 {
        self.current + self.expiring_soon + self.critical + self.overdue + self.unknown
    }
}

// ========================================
// Notification tiers and routing
// ========================================

/// Notification tier
///
/// Declaration order is the order tiers are attempted within one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Overdue,
    Critical,
    Warning,
    VendorPo,
    WeeklySummary,
}

impl Tier {
    /// Escalation tiers sent by the daily enforcement scan, most urgent first
    pub const ESCALATION: [Tier; 4] = [Tier::Overdue, Tier::Critical, Tier::Warning, Tier::VendorPo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Overdue => "overdue",
            Tier::Critical => "critical",
            Tier::Warning => "warning",
            Tier::VendorPo => "vendor_po",
            Tier::WeeklySummary => "weekly_summary",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overdue" => Ok(Tier::Overdue),
            "critical" => Ok(Tier::Critical),
            "warning" => Ok(Tier::Warning),
            "vendor_po" | "purchasing" => Ok(Tier::VendorPo),
            "weekly_summary" | "summary" => Ok(Tier::WeeklySummary),
            other => Err(Error::InvalidInput(format!("unknown notification tier: {other}"))),
        }
    }
}

/// Recipients and optional subject template for one tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub recipients: Vec<String>,
    /// Supports `{company}` and `{count}` placeholders
    pub subject_template: Option<String>,
}

/// Tier → route table for one tenant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRouting {
    routes: BTreeMap<Tier, Route>,
}

impl TierRouting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, tier: Tier, recipients: &[&str], subject_template: Option<&str>) -> Self {
        self.insert(
            tier,
            Route {
                recipients: recipients.iter().map(|r| r.to_string()).collect(),
                subject_template: subject_template.map(str::to_string),
            },
        );
        self
    }

    pub fn insert(&mut self, tier: Tier, route: Route) {
        self.routes.insert(tier, route);
    }

    pub fn route(&self, tier: Tier) -> Option<&Route> {
        self.routes.get(&tier).filter(|r| !r.recipients.is_empty())
    }

    pub fn recipients(&self, tier: Tier) -> &[String] {
        self.route(tier).map(|r| r.recipients.as_slice()).unwrap_or(&[])
    }

    /// True when at least one tier has a recipient
    pub fn is_configured(&self) -> bool {
        self.routes.values().any(|r| !r.recipients.is_empty())
    }
}

/// A customer account: isolation boundary for equipment and routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub slug: String,
    pub name: String,
    /// RFC 5322 sender, e.g. `Cal - Acme <cal@acme.gp3.app>`
    pub sender: String,
    pub onboarded: bool,
    pub routing: TierRouting,
}

impl Tenant {
    /// Onboarded with at least one routed tier
    pub fn is_enrolled(&self) -> bool {
        self.onboarded && self.routing.is_configured()
    }
}

// ========================================
// Audit trail
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    Failed,
}

impl DeliveryOutcome {
    pub fn from_sent(sent: bool) -> Self {
        if sent {
            DeliveryOutcome::Sent
        } else {
            DeliveryOutcome::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Sent => "sent",
            DeliveryOutcome::Failed => "failed",
        }
    }
}

/// One outbound message attempt. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub tenant_id: TenantId,
    pub tier: Tier,
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub outcome: DeliveryOutcome,
    pub dedup_key: Option<String>,
    /// Operational-timezone date of the attempt
    pub sent_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Key identifying "the same notification on the same day"
///
/// Hash of tenant, tier, the sorted equipment ids and the date. Two scans
/// on one day over an unchanged equipment set yield the same key.
pub fn dedup_key(tenant: TenantId, tier: Tier, equipment: &[EquipmentId], on: NaiveDate) -> String {
    let mut ids = equipment.to_vec();
    ids.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(tenant.to_le_bytes());
    hasher.update(tier.as_str().as_bytes());
    for id in &ids {
        hasher.update(id.to_le_bytes());
    }
    hasher.update(on.format("%Y-%m-%d").to_string().as_bytes());

    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Outbound audit row as read back for operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub tier: Option<String>,
    pub to_address: String,
    pub subject: String,
    pub status: String,
    pub created_at: String,
}
