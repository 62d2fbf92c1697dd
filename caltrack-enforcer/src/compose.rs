//! Notification composition
//!
//! Turns a tier's equipment list into a plain-text message. Routing is
//! supplied by the caller as a [`TierRouting`] table; nothing here knows
//! any addresses.

use chrono::NaiveDate;
use std::fmt::Write;

use caltrack_common::models::{Equipment, Tier, TierRouting};
use caltrack_common::status::days_until;

use crate::delivery::Message;
use crate::enforce::ComplianceSummary;

struct TierCopy {
    subject: &'static str,
    heading: &'static str,
    action: &'static str,
}

fn copy_for(tier: Tier) -> TierCopy {
    match tier {
        Tier::Overdue => TierCopy {
            subject: "[ACTION REQUIRED] {count} overdue calibration(s) - {company}",
            heading: "OVERDUE CALIBRATIONS",
            action: "Remove these instruments from service immediately and arrange calibration. \
                     They must not be used for product acceptance until recalibrated.",
        },
        Tier::Critical => TierCopy {
            subject: "[URGENT] {count} calibration(s) due within 7 days - {company}",
            heading: "CALIBRATION DUE WITHIN 7 DAYS",
            action: "Collect these instruments and schedule calibration now so they do not go overdue.",
        },
        Tier::Warning => TierCopy {
            subject: "{count} calibration(s) due within 30 days - {company}",
            heading: "CALIBRATION DUE WITHIN 30 DAYS",
            action: "Plan calibration for these instruments before their due dates.",
        },
        Tier::VendorPo => TierCopy {
            subject: "Purchase orders needed: {count} vendor calibration(s) - {company}",
            heading: "VENDOR CALIBRATION - PURCHASE ORDER NEEDED",
            action: "Raise purchase orders with the listed vendors so these instruments \
                     can ship before their due dates.",
        },
        Tier::WeeklySummary => TierCopy {
            subject: "Weekly calibration summary - {company} ({compliance}% compliant)",
            heading: "WEEKLY CALIBRATION SUMMARY",
            action: "Review the counts below. Overdue and critical items have been escalated separately.",
        },
    }
}

fn render_subject(template: &str, company: &str, count: usize, compliance: Option<f64>) -> String {
    let mut subject = template
        .replace("{company}", company)
        .replace("{count}", &count.to_string());
    if let Some(pct) = compliance {
        subject = subject.replace("{compliance}", &format!("{pct:.1}"));
    }
    subject
}

fn subject_for(tier: Tier, routing: &TierRouting, company: &str, count: usize, compliance: Option<f64>) -> String {
    let template = routing
        .route(tier)
        .and_then(|r| r.subject_template.as_deref())
        .unwrap_or(copy_for(tier).subject);
    render_subject(template, company, count, compliance)
}

/// Compose one escalation tier's message
///
/// Returns `None` when there is nothing to send: no equipment, or no
/// recipients routed for `tier`. Rows are ordered by ascending due date;
/// items without a due date are skipped.
pub fn compose(
    tier: Tier,
    equipment: &[&Equipment],
    company: &str,
    routing: &TierRouting,
    today: NaiveDate,
) -> Option<Message> {
    let route = routing.route(tier)?;

    let mut rows: Vec<&Equipment> = equipment
        .iter()
        .copied()
        .filter(|e| e.next_due.is_some())
        .collect();
    if rows.is_empty() {
        return None;
    }
    rows.sort_by(|a, b| a.next_due.cmp(&b.next_due).then_with(|| a.identifier.cmp(&b.identifier)));

    let copy = copy_for(tier);
    let mut body = String::new();
    let _ = writeln!(body, "{} - {}", copy.heading, company);
    let _ = writeln!(body, "{}", "=".repeat(copy.heading.len() + company.len() + 3));
    let _ = writeln!(body);
    let _ = writeln!(body, "{}", copy.action);
    let _ = writeln!(body);
    write_equipment_table(&mut body, &rows, today);
    let _ = writeln!(body);
    let _ = writeln!(body, "{} item(s). Generated {}.", rows.len(), today.format("%Y-%m-%d"));

    Some(Message {
        recipients: route.recipients.clone(),
        subject: subject_for(tier, routing, company, rows.len(), None),
        body,
    })
}

fn write_equipment_table(body: &mut String, rows: &[&Equipment], today: NaiveDate) {
    let _ = writeln!(
        body,
        "{:<14} {:<28} {:<16} {:<22} {:<10} {:>6}",
        "Tag", "Name", "Category", "Calibrated by", "Due", "Days"
    );
    let _ = writeln!(body, "{}", "-".repeat(101));
    for e in rows {
        let (due, days) = match e.next_due {
            Some(due) => (due.format("%Y-%m-%d").to_string(), days_until(due, today).to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        let _ = writeln!(
            body,
            "{:<14} {:<28} {:<16} {:<22} {:<10} {:>6}",
            clip(&e.identifier, 14),
            clip(&e.name, 28),
            clip(&e.category, 16),
            clip(&e.calibrated_by, 22),
            due,
            days
        );
    }
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut clipped: String = value.chars().take(width.saturating_sub(1)).collect();
        clipped.push('~');
        clipped
    }
}

/// Compose the weekly summary for one tenant; `None` without a
/// `weekly_summary` route
pub fn compose_weekly_summary(
    summary: &ComplianceSummary,
    company: &str,
    routing: &TierRouting,
    today: NaiveDate,
) -> Option<Message> {
    let route = routing.route(Tier::WeeklySummary)?;
    let copy = copy_for(Tier::WeeklySummary);
    let counts = &summary.counts;

    let mut body = String::new();
    let _ = writeln!(body, "{} - {}", copy.heading, company);
    let _ = writeln!(body, "Week of {}", today.format("%Y-%m-%d"));
    let _ = writeln!(body);
    let _ = writeln!(body, "Compliance rate: {:.1}%", summary.compliance_pct);
    let _ = writeln!(body, "Active equipment: {}", summary.total_active);
    let _ = writeln!(body);
    let _ = writeln!(body, "  Current:          {:>5}", counts.current);
    let _ = writeln!(body, "  Expiring (30d):   {:>5}", counts.expiring_soon);
    let _ = writeln!(body, "  Critical (7d):    {:>5}", counts.critical);
    let _ = writeln!(body, "  Overdue:          {:>5}", counts.overdue);
    let _ = writeln!(body, "  No due date:      {:>5}", counts.unknown);

    if !summary.categories.is_empty() {
        let _ = writeln!(body);
        let _ = writeln!(body, "By category:");
        for category in &summary.categories {
            let _ = writeln!(body, "  {:<28} {:>5}", clip(&category.category, 28), category.count);
        }
    }

    let _ = writeln!(body);
    let _ = writeln!(body, "{}", copy.action);

    Some(Message {
        recipients: route.recipients.clone(),
        subject: subject_for(
            Tier::WeeklySummary,
            routing,
            company,
            summary.total_active as usize,
            Some(summary.compliance_pct),
        ),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use caltrack_common::models::{CalibrationMethod, CalibrationStatus};
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn item(id: i64, tag: &str, due_in: Option<i64>) -> Equipment {
        Equipment {
            id,
            tenant_id: 1,
            identifier: tag.to_string(),
            name: format!("{tag} micrometer"),
            category: "Micrometer".to_string(),
            method: CalibrationMethod::InHouse,
            calibrated_by: "QA Lab".to_string(),
            active: true,
            last_calibrated: None,
            next_due: due_in.map(|d| today() + Duration::days(d)),
            status: CalibrationStatus::Overdue,
        }
    }

    fn routing() -> TierRouting {
        TierRouting::new()
            .with_route(Tier::Overdue, &["qa@acme.test"], None)
            .with_route(Tier::Critical, &["lead@acme.test"], Some("{company}: {count} due this week"))
    }

    #[test]
    fn test_rows_sorted_by_due_date() {
        let a = item(1, "CAL-A", Some(-1));
        let b = item(2, "CAL-B", Some(-10));
        let c = item(3, "CAL-C", Some(-5));
        let message = compose(Tier::Overdue, &[&a, &b, &c], "Acme", &routing(), today()).unwrap();

        let pos = |tag: &str| message.body.find(tag).unwrap();
        assert!(pos("CAL-B") < pos("CAL-C"));
        assert!(pos("CAL-C") < pos("CAL-A"));
        assert!(message.body.contains("OVERDUE CALIBRATIONS - Acme"));
        assert!(message.body.contains("3 item(s)"));
    }

    #[test]
    fn test_default_and_configured_subjects() {
        let a = item(1, "CAL-A", Some(-1));
        let overdue = compose(Tier::Overdue, &[&a], "Acme", &routing(), today()).unwrap();
        assert_eq!(overdue.subject, "[ACTION REQUIRED] 1 overdue calibration(s) - Acme");
        assert_eq!(overdue.recipients, vec!["qa@acme.test".to_string()]);

        let b = item(2, "CAL-B", Some(3));
        let critical = compose(Tier::Critical, &[&b], "Acme", &routing(), today()).unwrap();
        assert_eq!(critical.subject, "Acme: 1 due this week");
    }

    #[test]
    fn test_nothing_composed_without_route_or_items() {
        let a = item(1, "CAL-A", Some(20));
        assert!(compose(Tier::Warning, &[&a], "Acme", &routing(), today()).is_none());
        assert!(compose(Tier::Overdue, &[], "Acme", &routing(), today()).is_none());

        let undated = item(2, "CAL-X", None);
        assert!(compose(Tier::Overdue, &[&undated], "Acme", &routing(), today()).is_none());
    }

    #[test]
    fn test_table_shows_days_until_due() {
        let a = item(1, "CAL-A", Some(-3));
        let message = compose(Tier::Overdue, &[&a], "Acme", &routing(), today()).unwrap();
        let row = message.body.lines().find(|l| l.starts_with("CAL-A")).unwrap();
        assert!(row.contains("2025-05-30"));
        assert!(row.trim_end().ends_with("-3"));
    }

    #[test]
    fn test_clip_long_values() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghijkl", 5), "abcd~");
    }
}
