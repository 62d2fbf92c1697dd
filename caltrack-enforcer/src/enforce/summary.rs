//! Weekly compliance summary math

use serde::Serialize;
use std::collections::HashMap;

use caltrack_common::models::{CalibrationStatus, Equipment, StatusCounts};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceSummary {
    pub counts: StatusCounts,
    pub total_active: u32,
    /// `current / total_active * 100`, one decimal; 0.0 with no equipment
    pub compliance_pct: f64,
    /// Descending by count, ties by name
    pub categories: Vec<CategoryCount>,
}

pub fn compliance_pct(current: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = f64::from(current) / f64::from(total) * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Summarise a tenant's active equipment by stored status and category
pub fn summarize(equipment: &[Equipment]) -> ComplianceSummary {
    let mut counts = StatusCounts::default();
    let mut by_category: HashMap<&str, u32> = HashMap::new();

    for e in equipment.iter().filter(|e| e.active) {
        counts.add(e.status, 1);
        let category = match e.category.trim() {
            "" => "Uncategorized",
            name => name,
        };
        *by_category.entry(category).or_default() += 1;
    }

    let mut categories: Vec<CategoryCount> = by_category
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
        })
        .collect();
    categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));

    let total_active = counts.total();
    ComplianceSummary {
        compliance_pct: compliance_pct(counts.get(CalibrationStatus::Current), total_active),
        counts,
        total_active,
        categories,
    }
}
