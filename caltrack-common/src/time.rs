//! Clock and date utilities
//!
//! All scheduling decisions and date math use one operational timezone,
//! expressed as a fixed UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::sync::RwLock;

/// Source of "now" and "today" in the operational timezone
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock shifted into the operational timezone
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self { now: RwLock::new(now) }
    }

    /// Midnight UTC on `date`
    pub fn on(date: NaiveDate) -> Self {
        let midnight = date.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset();
        Self::new(midnight)
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    pub fn advance_days(&self, days: i64) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += chrono::Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Fixed offset from a minute count, e.g. `-300` for UTC-05:00
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

/// Parse a stored calendar date
///
/// Accepts ISO dates, ISO timestamps (date part only) and US-style
/// `MM/DD/YYYY` as found in imported registries. Anything else is `None`
/// and classifies like an absent due date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Some(prefix) = value.get(..10) {
        if value.len() > 10 && matches!(value.as_bytes()[10], b'T' | b' ') {
            if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
                return Some(date);
            }
        }
    }
    NaiveDate::parse_from_str(value, "%m/%d/%Y").ok()
}

/// Format a date the way it is stored (`YYYY-MM-DD`)
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_date("2025-03-01"), NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(parse_date(" 2025-03-01 "), NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn test_parse_timestamp_takes_date_part() {
        assert_eq!(parse_date("2025-03-01T10:00:00Z"), NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(parse_date("2025-03-01 10:00:00"), NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn test_parse_us_date() {
        assert_eq!(parse_date("03/01/2025"), NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn test_malformed_dates_are_none() {
        for bad in ["", "   ", "TBD", "2025-13-01", "2025-02-30", "N/A", "01-03-2025x"] {
            assert_eq!(parse_date(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn test_system_clock_uses_offset() {
        let offset = offset_from_minutes(-300).unwrap();
        let clock = SystemClock::new(offset);
        assert_eq!(clock.now().offset().local_minus_utc(), -300 * 60);
    }

    #[test]
    fn test_offset_out_of_range_is_none() {
        assert!(offset_from_minutes(24 * 60).is_none());
        assert!(offset_from_minutes(i32::MAX).is_none());
    }

    #[test]
    fn test_today_follows_operational_timezone() {
        // 2025-03-01 03:00 UTC is still Feb 28 at UTC-05:00
        let utc = Utc.with_ymd_and_hms(2025, 3, 1, 3, 0, 0).unwrap();
        let offset = offset_from_minutes(-300).unwrap();
        let clock = FixedClock::new(utc.with_timezone(&offset));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        clock.advance_days(1);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }
}
