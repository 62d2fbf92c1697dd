//! In-memory collaborators for enforcer tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use caltrack_common::models::{
    CalibrationMethod, CalibrationStatus, DeliveryOutcome, Equipment, EquipmentId,
    AuditEntry, NotificationEvent, StatusCounts, Tenant, TenantId, Tier, TierRouting,
};
use caltrack_common::status::classify_due;
use caltrack_common::store::{AuditSink, ComplianceRecords, EquipmentStore, TenantDirectory};
use caltrack_common::time::FixedClock;
use caltrack_common::{Error, Result};
use caltrack_enforcer::delivery::{DeliveryChannel, Message};
use caltrack_enforcer::enforce::{Enforcer, EnforcerDeps, EnforcerOptions};

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

pub fn equipment(
    id: EquipmentId,
    tenant_id: TenantId,
    tag: &str,
    due_in: Option<i64>,
    method: CalibrationMethod,
) -> Equipment {
    Equipment {
        id,
        tenant_id,
        identifier: tag.to_string(),
        name: format!("{tag} gauge"),
        category: "Gauge".to_string(),
        method,
        calibrated_by: "Metrology Lab".to_string(),
        active: true,
        last_calibrated: None,
        next_due: due_in.map(|d| today() + Duration::days(d)),
        status: CalibrationStatus::Unknown,
    }
}

pub fn full_routing(domain: &str) -> TierRouting {
    TierRouting::new()
        .with_route(Tier::Overdue, &[&format!("qa@{domain}")], None)
        .with_route(Tier::Critical, &[&format!("lead@{domain}")], None)
        .with_route(Tier::Warning, &[&format!("planner@{domain}")], None)
        .with_route(Tier::VendorPo, &[&format!("purchasing@{domain}")], None)
        .with_route(Tier::WeeklySummary, &[&format!("manager@{domain}")], None)
}

pub fn tenant(id: TenantId, slug: &str, onboarded: bool, routing: TierRouting) -> Tenant {
    Tenant {
        id,
        slug: slug.to_string(),
        name: slug.to_uppercase(),
        sender: format!("Cal - {} <cal@{}.gp3.app>", slug.to_uppercase(), slug),
        onboarded,
        routing,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub items: Mutex<Vec<Equipment>>,
    pub failing_updates: Mutex<HashSet<EquipmentId>>,
    pub failing_tenants: Mutex<HashSet<TenantId>>,
    pub update_calls: Mutex<u32>,
}

impl MemoryStore {
    pub fn with(items: Vec<Equipment>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Default::default()
        }
    }

    pub fn status_of(&self, id: EquipmentId) -> CalibrationStatus {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.status)
            .unwrap()
    }

    pub fn set_status(&self, id: EquipmentId, status: CalibrationStatus) {
        for e in self.items.lock().unwrap().iter_mut().filter(|e| e.id == id) {
            e.status = status;
        }
    }

    pub fn set_due(&self, id: EquipmentId, next_due: Option<NaiveDate>) {
        for e in self.items.lock().unwrap().iter_mut().filter(|e| e.id == id) {
            e.next_due = next_due;
        }
    }
}

#[async_trait]
impl EquipmentStore for MemoryStore {
    async fn list_active_equipment(&self, tenant: TenantId) -> Result<Vec<Equipment>> {
        if self.failing_tenants.lock().unwrap().contains(&tenant) {
            return Err(Error::Internal("equipment read failed".to_string()));
        }
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.tenant_id == tenant && e.active)
            .cloned()
            .collect())
    }

    async fn update_status(&self, equipment: EquipmentId, status: CalibrationStatus) -> Result<()> {
        *self.update_calls.lock().unwrap() += 1;
        if self.failing_updates.lock().unwrap().contains(&equipment) {
            return Err(Error::Internal("write rejected".to_string()));
        }
        self.set_status(equipment, status);
        Ok(())
    }
}

/// Audit reads are served by [`MemoryAudit`], so this store reports none
#[async_trait]
impl ComplianceRecords for MemoryStore {
    async fn record_calibration(
        &self,
        equipment: EquipmentId,
        calibrated_on: NaiveDate,
        next_due: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<CalibrationStatus> {
        let status = classify_due(next_due, today);
        let mut items = self.items.lock().unwrap();
        let item = items
            .iter_mut()
            .find(|e| e.id == equipment)
            .ok_or_else(|| Error::NotFound(format!("equipment {equipment}")))?;
        item.last_calibrated = Some(calibrated_on);
        item.next_due = next_due;
        item.status = status;
        Ok(status)
    }

    async fn flag_overdue(&self, equipment: EquipmentId) -> Result<()> {
        self.update_status(equipment, CalibrationStatus::Overdue).await
    }

    async fn tenant_status_counts(&self, tenant: TenantId) -> Result<StatusCounts> {
        let mut counts = StatusCounts::default();
        for item in self.list_active_equipment(tenant).await? {
            counts.add(item.status, 1);
        }
        Ok(counts)
    }

    async fn recent_audit_entries(&self, _tenant: TenantId, _limit: u32) -> Result<Vec<AuditEntry>> {
        Ok(Vec::new())
    }
}

pub struct MemoryDirectory {
    pub tenants: Vec<Tenant>,
}

#[async_trait]
impl TenantDirectory for MemoryDirectory {
    async fn list_active_tenants(&self) -> Result<Vec<Tenant>> {
        Ok(self.tenants.clone())
    }

    async fn list_onboarded_tenants(&self) -> Result<Vec<Tenant>> {
        Ok(self.tenants.iter().filter(|t| t.onboarded).cloned().collect())
    }
}

/// Audit log in memory; with `rejecting` set every write fails
#[derive(Default)]
pub struct MemoryAudit {
    pub events: Mutex<Vec<NotificationEvent>>,
    pub rejecting: Mutex<bool>,
}

impl MemoryAudit {
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn for_tenant(&self, tenant: TenantId) -> Vec<NotificationEvent> {
        self.events().into_iter().filter(|e| e.tenant_id == tenant).collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAudit {
    async fn record(&self, event: &NotificationEvent) -> Result<()> {
        if *self.rejecting.lock().unwrap() {
            return Err(Error::Internal("audit log unavailable".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn was_sent(&self, tenant: TenantId, dedup_key: &str, on: NaiveDate) -> Result<bool> {
        Ok(self.events.lock().unwrap().iter().any(|e| {
            e.tenant_id == tenant
                && e.sent_on == on
                && e.outcome == DeliveryOutcome::Sent
                && e.dedup_key.as_deref() == Some(dedup_key)
        }))
    }
}

/// Records every attempt; senders in `failing_senders` are refused
#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Mutex<Vec<(String, Message)>>,
    pub failing_senders: Mutex<HashSet<String>>,
    pub delay: Option<std::time::Duration>,
}

impl RecordingChannel {
    pub fn slow(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> Vec<(String, Message)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.attempts().into_iter().map(|(_, m)| m.subject).collect()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn send(&self, sender: &str, message: &Message) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((sender.to_string(), message.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        !self.failing_senders.lock().unwrap().contains(sender)
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub audit: Arc<MemoryAudit>,
    pub channel: Arc<RecordingChannel>,
    pub clock: Arc<FixedClock>,
    pub enforcer: Arc<Enforcer>,
}

pub fn harness(
    items: Vec<Equipment>,
    tenants: Vec<Tenant>,
    channel: RecordingChannel,
    options: EnforcerOptions,
) -> Harness {
    let store = Arc::new(MemoryStore::with(items));
    let audit = Arc::new(MemoryAudit::default());
    let channel = Arc::new(channel);
    let clock = Arc::new(FixedClock::on(today()));
    let enforcer = Arc::new(Enforcer::new(
        EnforcerDeps {
            store: store.clone(),
            directory: Arc::new(MemoryDirectory { tenants }),
            audit: audit.clone(),
            channel: channel.clone(),
            clock: clock.clone(),
        },
        options,
    ));

    Harness {
        store,
        audit,
        channel,
        clock,
        enforcer,
    }
}

/// Tenant "acme" (id 1): A overdue, B critical, C vendor warning, D current
pub fn acme_fleet() -> Vec<Equipment> {
    vec![
        equipment(1, 1, "CAL-A", Some(-3), CalibrationMethod::InHouse),
        equipment(2, 1, "CAL-B", Some(5), CalibrationMethod::InHouse),
        equipment(3, 1, "CAL-C", Some(20), CalibrationMethod::Vendor),
        equipment(4, 1, "CAL-D", Some(90), CalibrationMethod::InHouse),
    ]
}
