//! Enforcement passes: status refresh, daily escalation scan, weekly summary
//!
//! Every pass walks tenants strictly one after another. A failure on one
//! item, tenant or send is logged and counted and the pass moves on; the
//! returned [`EnforcementRun`] reflects whatever completed.
//!
//! Passes started through [`Enforcer::run_job`] / [`Enforcer::try_run_job`]
//! hold a process-wide gate, so at most one pass mutates equipment or sends
//! mail at a time.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use caltrack_common::models::{dedup_key, DeliveryOutcome, NotificationEvent, Tenant, Tier};
use caltrack_common::status::{classify, transition, Transition};
use caltrack_common::store::{AuditSink, EquipmentStore, TenantDirectory};
use caltrack_common::time::Clock;

use crate::compose::{compose, compose_weekly_summary};
use crate::delivery::{DeliveryChannel, Message};

mod partition;
mod summary;

pub use partition::{partition, Partitions};
pub use summary::{compliance_pct, summarize, CategoryCount, ComplianceSummary};

/// The three scheduled jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    StatusRefresh,
    DailyEnforcement,
    WeeklySummary,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::StatusRefresh => "status_refresh",
            JobKind::DailyEnforcement => "daily_enforcement",
            JobKind::WeeklySummary => "weekly_summary",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one pass, returned to the caller and logged
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnforcementRun {
    pub run_id: Uuid,
    pub job: JobKind,
    pub started_at: DateTime<FixedOffset>,
    pub finished_at: Option<DateTime<FixedOffset>>,
    pub tenants_processed: u32,
    /// Not onboarded, no routing, or equipment unreadable
    pub tenants_skipped: u32,
    pub statuses_updated: u32,
    pub update_failures: u32,
    pub notifications_sent: u32,
    pub notifications_failed: u32,
    pub notifications_deduplicated: u32,
}

impl EnforcementRun {
    fn start(job: JobKind, started_at: DateTime<FixedOffset>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            job,
            started_at,
            finished_at: None,
            tenants_processed: 0,
            tenants_skipped: 0,
            statuses_updated: 0,
            update_failures: 0,
            notifications_sent: 0,
            notifications_failed: 0,
            notifications_deduplicated: 0,
        }
    }
}

/// Result of a status refresh sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub tenants_processed: u32,
    pub statuses_updated: u32,
    pub update_failures: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct EnforcerOptions {
    /// Skip a tier message whose dedup key was already sent today
    pub dedupe_same_day: bool,
    /// Upper bound on one delivery attempt
    pub send_timeout: Duration,
}

impl Default for EnforcerOptions {
    fn default() -> Self {
        Self {
            dedupe_same_day: false,
            send_timeout: Duration::from_secs(15),
        }
    }
}

/// Collaborators of an [`Enforcer`], constructed once at startup
#[derive(Clone)]
pub struct EnforcerDeps {
    pub store: Arc<dyn EquipmentStore>,
    pub directory: Arc<dyn TenantDirectory>,
    pub audit: Arc<dyn AuditSink>,
    pub channel: Arc<dyn DeliveryChannel>,
    pub clock: Arc<dyn Clock>,
}

pub struct Enforcer {
    deps: EnforcerDeps,
    options: EnforcerOptions,
    gate: Mutex<()>,
    last_run: RwLock<Option<EnforcementRun>>,
}

impl Enforcer {
    pub fn new(deps: EnforcerDeps, options: EnforcerOptions) -> Self {
        Self {
            deps,
            options,
            gate: Mutex::new(()),
            last_run: RwLock::new(None),
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.deps.clock.clone()
    }

    pub async fn last_run(&self) -> Option<EnforcementRun> {
        self.last_run.read().await.clone()
    }

    /// Run `job`, waiting for any pass already in progress
    pub async fn run_job(&self, job: JobKind) -> EnforcementRun {
        let _guard = self.gate.lock().await;
        self.execute(job).await
    }

    /// Run `job` unless a pass is already in progress
    pub async fn try_run_job(&self, job: JobKind) -> Option<EnforcementRun> {
        let _guard = self.gate.try_lock().ok()?;
        Some(self.execute(job).await)
    }

    async fn execute(&self, job: JobKind) -> EnforcementRun {
        let run = match job {
            JobKind::StatusRefresh => {
                let mut run = EnforcementRun::start(job, self.deps.clock.now());
                let outcome = self.refresh_statuses().await;
                run.tenants_processed = outcome.tenants_processed;
                run.statuses_updated = outcome.statuses_updated;
                run.update_failures = outcome.update_failures;
                run.finished_at = Some(self.deps.clock.now());
                run
            }
            JobKind::DailyEnforcement => self.enforcement_scan().await,
            JobKind::WeeklySummary => self.weekly_summary().await,
        };

        info!(
            run_id = %run.run_id,
            job = %run.job,
            tenants = run.tenants_processed,
            skipped = run.tenants_skipped,
            updated = run.statuses_updated,
            sent = run.notifications_sent,
            failed = run.notifications_failed,
            deduplicated = run.notifications_deduplicated,
            "Enforcement pass complete"
        );

        *self.last_run.write().await = Some(run.clone());
        run
    }

    /// Onboarded tenants for notification passes
    async fn onboarded_tenants(&self) -> Vec<Tenant> {
        match self.deps.directory.list_onboarded_tenants().await {
            Ok(tenants) => tenants,
            Err(e) => {
                warn!("Failed to list tenants: {}", e);
                Vec::new()
            }
        }
    }

    /// Every active tenant for the status sweep
    async fn active_tenants(&self) -> Vec<Tenant> {
        match self.deps.directory.list_active_tenants().await {
            Ok(tenants) => tenants,
            Err(e) => {
                warn!("Failed to list active tenants: {}", e);
                Vec::new()
            }
        }
    }

    /// Recompute and persist the status of every active item of every
    /// active tenant, onboarded or not
    ///
    /// A failed read skips that tenant; a failed write leaves that item's
    /// prior status and does not count as updated. Idempotent for a fixed
    /// date.
    pub async fn refresh_statuses(&self) -> RefreshOutcome {
        let today = self.deps.clock.today();
        let mut outcome = RefreshOutcome::default();

        for tenant in self.active_tenants().await {
            let equipment = match self.deps.store.list_active_equipment(tenant.id).await {
                Ok(equipment) => equipment,
                Err(e) => {
                    warn!(tenant = %tenant.slug, "Status refresh skipped tenant: {}", e);
                    continue;
                }
            };
            outcome.tenants_processed += 1;

            for item in equipment.iter().filter(|e| e.active) {
                let computed = classify(item, today);
                let Transition::Update(status) = transition(item.status, computed) else {
                    continue;
                };

                match self.deps.store.update_status(item.id, status).await {
                    Ok(()) => {
                        debug!(
                            tenant = %tenant.slug,
                            equipment = %item.identifier,
                            from = %item.status,
                            to = %status,
                            "Status updated"
                        );
                        outcome.statuses_updated += 1;
                    }
                    Err(e) => {
                        warn!(
                            tenant = %tenant.slug,
                            equipment = %item.identifier,
                            "Status update failed: {}", e
                        );
                        outcome.update_failures += 1;
                    }
                }
            }
        }

        info!(
            tenants = outcome.tenants_processed,
            updated = outcome.statuses_updated,
            failures = outcome.update_failures,
            "Status refresh complete"
        );
        outcome
    }

    /// Refresh statuses, then send tiered escalations for every enrolled
    /// tenant
    ///
    /// Within a tenant tiers go overdue, critical, warning, vendor PO.
    /// Empty tiers and tiers without recipients send nothing.
    pub async fn enforcement_scan(&self) -> EnforcementRun {
        let mut run = EnforcementRun::start(JobKind::DailyEnforcement, self.deps.clock.now());

        let refreshed = self.refresh_statuses().await;
        run.statuses_updated = refreshed.statuses_updated;
        run.update_failures = refreshed.update_failures;

        let today = self.deps.clock.today();
        for tenant in self.onboarded_tenants().await {
            if !tenant.is_enrolled() {
                debug!(tenant = %tenant.slug, "Tenant not enrolled; skipping");
                run.tenants_skipped += 1;
                continue;
            }

            let equipment = match self.deps.store.list_active_equipment(tenant.id).await {
                Ok(equipment) => equipment,
                Err(e) => {
                    warn!(tenant = %tenant.slug, "Enforcement skipped tenant: {}", e);
                    run.tenants_skipped += 1;
                    continue;
                }
            };
            run.tenants_processed += 1;

            let parts = partition(&equipment);
            for tier in Tier::ESCALATION {
                let items = parts.get(tier);
                if items.is_empty() {
                    continue;
                }
                let Some(message) = compose(tier, items, &tenant.name, &tenant.routing, today) else {
                    debug!(tenant = %tenant.slug, tier = %tier, "No recipients routed for tier");
                    continue;
                };
                let ids: Vec<i64> = items.iter().map(|e| e.id).collect();
                self.deliver(&tenant, tier, &ids, message, today, &mut run).await;
            }
        }

        run.finished_at = Some(self.deps.clock.now());
        run
    }

    /// Refresh statuses, then send one compliance summary per enrolled
    /// tenant
    pub async fn weekly_summary(&self) -> EnforcementRun {
        let mut run = EnforcementRun::start(JobKind::WeeklySummary, self.deps.clock.now());

        let refreshed = self.refresh_statuses().await;
        run.statuses_updated = refreshed.statuses_updated;
        run.update_failures = refreshed.update_failures;

        let today = self.deps.clock.today();
        for tenant in self.onboarded_tenants().await {
            if !tenant.is_enrolled() {
                run.tenants_skipped += 1;
                continue;
            }

            let equipment = match self.deps.store.list_active_equipment(tenant.id).await {
                Ok(equipment) => equipment,
                Err(e) => {
                    warn!(tenant = %tenant.slug, "Weekly summary skipped tenant: {}", e);
                    run.tenants_skipped += 1;
                    continue;
                }
            };
            run.tenants_processed += 1;

            let summary = summarize(&equipment);
            debug!(
                tenant = %tenant.slug,
                total = summary.total_active,
                compliance = summary.compliance_pct,
                "Weekly summary computed"
            );

            let Some(message) = compose_weekly_summary(&summary, &tenant.name, &tenant.routing, today)
            else {
                debug!(tenant = %tenant.slug, "No weekly_summary route; skipping");
                continue;
            };
            let ids: Vec<i64> = equipment.iter().map(|e| e.id).collect();
            self.deliver(&tenant, Tier::WeeklySummary, &ids, message, today, &mut run)
                .await;
        }

        run.finished_at = Some(self.deps.clock.now());
        run
    }

    /// One send attempt plus its audit entry
    async fn deliver(
        &self,
        tenant: &Tenant,
        tier: Tier,
        equipment_ids: &[i64],
        message: Message,
        today: NaiveDate,
        run: &mut EnforcementRun,
    ) {
        let key = self
            .options
            .dedupe_same_day
            .then(|| dedup_key(tenant.id, tier, equipment_ids, today));

        if let Some(key) = &key {
            match self.deps.audit.was_sent(tenant.id, key, today).await {
                Ok(true) => {
                    info!(tenant = %tenant.slug, tier = %tier, "Already sent today; skipping");
                    run.notifications_deduplicated += 1;
                    return;
                }
                Ok(false) => {}
                Err(e) => warn!(tenant = %tenant.slug, "Dedup lookup failed, sending anyway: {}", e),
            }
        }

        let send = self.deps.channel.send(&tenant.sender, &message);
        let sent = match tokio::time::timeout(self.options.send_timeout, send).await {
            Ok(sent) => sent,
            Err(_) => {
                warn!(tenant = %tenant.slug, tier = %tier, "Delivery timed out");
                false
            }
        };

        if sent {
            run.notifications_sent += 1;
            info!(
                tenant = %tenant.slug,
                tier = %tier,
                recipients = message.recipients.len(),
                "Notification sent"
            );
        } else {
            run.notifications_failed += 1;
            warn!(tenant = %tenant.slug, tier = %tier, "Notification failed");
        }

        let event = NotificationEvent {
            tenant_id: tenant.id,
            tier,
            sender: tenant.sender.clone(),
            recipients: message.recipients,
            subject: message.subject,
            body: message.body,
            outcome: DeliveryOutcome::from_sent(sent),
            dedup_key: key,
            sent_on: today,
            created_at: Utc::now(),
        };
        if let Err(e) = self.deps.audit.record(&event).await {
            warn!(tenant = %tenant.slug, tier = %tier, "Audit log write failed: {}", e);
        }
    }
}
