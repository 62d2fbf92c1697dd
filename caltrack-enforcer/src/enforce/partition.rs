//! Tier partitioning of a tenant's equipment

use caltrack_common::models::{CalibrationMethod, CalibrationStatus, Equipment, Tier};

/// Equipment grouped by escalation tier
///
/// Only items with a due date take part. `vendor_po` is the vendor-calibrated
/// subset of `warning`.
#[derive(Debug, Default)]
pub struct Partitions<'a> {
    pub overdue: Vec<&'a Equipment>,
    pub critical: Vec<&'a Equipment>,
    pub warning: Vec<&'a Equipment>,
    pub vendor_po: Vec<&'a Equipment>,
}

impl<'a> Partitions<'a> {
    pub fn get(&self, tier: Tier) -> &[&'a Equipment] {
        match tier {
            Tier::Overdue => &self.overdue,
            Tier::Critical => &self.critical,
            Tier::Warning => &self.warning,
            Tier::VendorPo => &self.vendor_po,
            Tier::WeeklySummary => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.critical.is_empty() && self.warning.is_empty()
    }
}

/// Partition by stored status (freshly refreshed by the caller)
pub fn partition(equipment: &[Equipment]) -> Partitions<'_> {
    let mut parts = Partitions::default();

    for e in equipment.iter().filter(|e| e.active && e.next_due.is_some()) {
        match e.status {
            CalibrationStatus::Overdue => parts.overdue.push(e),
            CalibrationStatus::Critical => parts.critical.push(e),
            CalibrationStatus::ExpiringSoon => {
                parts.warning.push(e);
                if e.method == CalibrationMethod::Vendor {
                    parts.vendor_po.push(e);
                }
            }
            CalibrationStatus::Current | CalibrationStatus::Unknown => {}
        }
    }

    parts
}
