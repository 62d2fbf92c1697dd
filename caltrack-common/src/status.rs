//! Calibration status classification
//!
//! `classify` maps a due date to a status relative to "today". `transition`
//! applies the stored-state rules on top of that: once equipment is
//! `Overdue` it stays `Overdue` until a new calibration record is written
//! (see `db::SqliteStore::record_calibration`), whatever the recomputed
//! status says.

use chrono::NaiveDate;

use crate::models::{CalibrationStatus, Equipment};

/// Inclusive upper bound, in days, of the `Critical` window
pub const CRITICAL_WINDOW_DAYS: i64 = 7;

/// Inclusive upper bound, in days, of the `ExpiringSoon` window
pub const EXPIRING_WINDOW_DAYS: i64 = 30;

/// Whole days from `today` until `due` (negative once past due)
pub fn days_until(due: NaiveDate, today: NaiveDate) -> i64 {
    (due - today).num_days()
}

/// Status for a due date
///
/// | days until due | status          |
/// |----------------|-----------------|
/// | < 0            | `Overdue`       |
/// | 0..=7          | `Critical`      |
/// | 8..=30         | `ExpiringSoon`  |
/// | > 30           | `Current`       |
/// | no due date    | `Unknown`       |
pub fn classify_due(next_due: Option<NaiveDate>, today: NaiveDate) -> CalibrationStatus {
    let Some(due) = next_due else {
        return CalibrationStatus::Unknown;
    };

    match days_until(due, today) {
        d if d < 0 => CalibrationStatus::Overdue,
        d if d <= CRITICAL_WINDOW_DAYS => CalibrationStatus::Critical,
        d if d <= EXPIRING_WINDOW_DAYS => CalibrationStatus::ExpiringSoon,
        _ => CalibrationStatus::Current,
    }
}

/// Status for one equipment item
pub fn classify(equipment: &Equipment, today: NaiveDate) -> CalibrationStatus {
    classify_due(equipment.next_due, today)
}

/// Outcome of comparing a stored status against a recomputed one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Stored status stands; nothing to persist
    Keep,
    /// Persist the new status
    Update(CalibrationStatus),
}

/// Decide whether a sweep must write a new status
///
/// `Overdue` is terminal for the sweep: only recording a calibration
/// clears it.
pub fn transition(stored: CalibrationStatus, computed: CalibrationStatus) -> Transition {
    if stored == CalibrationStatus::Overdue || stored == computed {
        Transition::Keep
    } else {
        Transition::Update(computed)
    }
}
