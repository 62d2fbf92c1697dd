//! Time-of-day scheduler for the three enforcement jobs
//!
//! Firing times are wall-clock times in the operational timezone. Each job
//! keeps its own next firing time; after a job runs, only that job is
//! rescheduled, so two jobs configured for the same minute both run (in
//! refresh, enforcement, summary order).

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use caltrack_common::config::OperationalSchedule;

use crate::enforce::{Enforcer, JobKind};

const JOBS: [JobKind; 3] = [
    JobKind::StatusRefresh,
    JobKind::DailyEnforcement,
    JobKind::WeeklySummary,
];

fn rank(job: JobKind) -> usize {
    JOBS.iter().position(|&j| j == job).unwrap_or(JOBS.len())
}

fn at(offset: FixedOffset, date: NaiveDate, time: NaiveTime) -> DateTime<FixedOffset> {
    let local = date.and_time(time);
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// First firing of `job` strictly after `after`
pub fn next_fire(
    job: JobKind,
    schedule: &OperationalSchedule,
    after: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    let offset = schedule.offset;
    let local_date = after.with_timezone(&offset).date_naive();

    let (time, weekday) = match job {
        JobKind::StatusRefresh => (schedule.status_refresh, None),
        JobKind::DailyEnforcement => (schedule.daily_enforcement, None),
        JobKind::WeeklySummary => (schedule.weekly_summary, Some(schedule.weekly_summary_day)),
    };

    // Eight days always contains a matching weekday strictly after `after`
    (0..=7)
        .map(|d| local_date + Duration::days(d))
        .filter(|date| weekday.map_or(true, |w| date.weekday() == w))
        .map(|date| at(offset, date, time))
        .find(|candidate| *candidate > after)
        .unwrap_or_else(|| at(offset, local_date + Duration::days(7), time))
}

/// The next job due strictly after `after`; ties resolve in refresh,
/// enforcement, summary order
pub fn next_job(
    schedule: &OperationalSchedule,
    after: DateTime<FixedOffset>,
) -> (JobKind, DateTime<FixedOffset>) {
    JOBS.iter()
        .map(|&job| (job, next_fire(job, schedule, after)))
        .min_by_key(|&(_, when)| when)
        .unwrap_or((JobKind::StatusRefresh, next_fire(JobKind::StatusRefresh, schedule, after)))
}

/// Spawn the background loop that fires each job at its configured time
///
/// Jobs go through [`Enforcer::run_job`], so a manual trigger in progress
/// delays a scheduled run rather than overlapping it.
pub fn spawn_scheduler(enforcer: Arc<Enforcer>, schedule: OperationalSchedule) -> JoinHandle<()> {
    tokio::spawn(async move {
        let clock = enforcer.clock();
        let start = clock.now();
        let mut pending: Vec<(JobKind, DateTime<FixedOffset>)> = JOBS
            .iter()
            .map(|&job| (job, next_fire(job, &schedule, start)))
            .collect();

        for (job, when) in &pending {
            info!(job = %job, next = %when.to_rfc3339(), "Job scheduled");
        }

        loop {
            pending.sort_by_key(|&(job, when)| (when, rank(job)));
            let (job, when) = pending[0];

            let wait = (when - clock.now()).to_std().unwrap_or_default();
            debug!(job = %job, wait_secs = wait.as_secs(), "Sleeping until next job");
            tokio::time::sleep(wait).await;

            enforcer.run_job(job).await;

            pending[0] = (job, next_fire(job, &schedule, when));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc, Weekday};

    fn schedule() -> OperationalSchedule {
        OperationalSchedule {
            offset: FixedOffset::west_opt(5 * 3600).unwrap(),
            status_refresh: NaiveTime::from_hms_opt(5, 45, 0).unwrap(),
            daily_enforcement: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            weekly_summary_day: Weekday::Mon,
            weekly_summary: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        }
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        schedule()
            .offset
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn test_daily_fire_same_day_when_before_time() {
        // 2025-06-04 is a Wednesday
        let after = local(2025, 6, 4, 3, 0);
        assert_eq!(next_fire(JobKind::StatusRefresh, &schedule(), after), local(2025, 6, 4, 5, 45));
        assert_eq!(next_fire(JobKind::DailyEnforcement, &schedule(), after), local(2025, 6, 4, 6, 0));
    }

    #[test]
    fn test_daily_fire_rolls_to_next_day() {
        let after = local(2025, 6, 4, 6, 0);
        assert_eq!(next_fire(JobKind::DailyEnforcement, &schedule(), after), local(2025, 6, 5, 6, 0));
    }

    #[test]
    fn test_weekly_fires_on_configured_weekday() {
        let after = local(2025, 6, 4, 12, 0);
        assert_eq!(next_fire(JobKind::WeeklySummary, &schedule(), after), local(2025, 6, 9, 7, 0));

        // Monday after the summary time waits a full week
        let monday_late = local(2025, 6, 9, 7, 0);
        assert_eq!(
            next_fire(JobKind::WeeklySummary, &schedule(), monday_late),
            local(2025, 6, 16, 7, 0)
        );
    }

    #[test]
    fn test_fire_times_use_operational_offset() {
        let after = Utc.with_ymd_and_hms(2025, 6, 4, 9, 0, 0).unwrap().fixed_offset();
        let fire = next_fire(JobKind::StatusRefresh, &schedule(), after);
        // 05:45 at UTC-05:00 is 10:45 UTC
        assert_eq!(fire.naive_utc(), Utc.with_ymd_and_hms(2025, 6, 4, 10, 45, 0).unwrap().naive_utc());
    }

    #[test]
    fn test_refresh_precedes_enforcement() {
        let (job, when) = next_job(&schedule(), local(2025, 6, 4, 0, 0));
        assert_eq!(job, JobKind::StatusRefresh);
        assert_eq!(when, local(2025, 6, 4, 5, 45));

        let (job, _) = next_job(&schedule(), when);
        assert_eq!(job, JobKind::DailyEnforcement);
    }

    #[test]
    fn test_ties_resolve_in_job_order() {
        let mut tied = schedule();
        tied.weekly_summary = tied.daily_enforcement;
        let (job, _) = next_job(&tied, local(2025, 6, 9, 5, 50));
        assert_eq!(job, JobKind::DailyEnforcement);
    }
}
