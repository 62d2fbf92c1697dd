//! SQLite persistence
//!
//! [`SqliteStore`] implements [`EquipmentStore`](crate::store::EquipmentStore),
//! [`TenantDirectory`](crate::store::TenantDirectory),
//! [`AuditSink`](crate::store::AuditSink) and
//! [`ComplianceRecords`](crate::store::ComplianceRecords) over one connection
//! pool. The pool is
//! created once at startup and handed in; nothing here holds global state.

use sqlx::SqlitePool;

mod audit;
mod equipment;
pub mod init;
mod records;
mod tenants;

pub use equipment::NewEquipment;
pub use init::{create_schema, init_database};

/// SQLite-backed store shared by the scheduler and the HTTP surface
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    /// Domain for tenant sender addresses: `cal@{slug}.{mail_domain}`
    mail_domain: String,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, mail_domain: impl Into<String>) -> Self {
        Self {
            pool,
            mail_domain: mail_domain.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Sender identity for a tenant
    pub fn sender_for(&self, slug: &str, name: &str) -> String {
        format!("Cal - {} <cal@{}.{}>", name, slug, self.mail_domain)
    }
}
