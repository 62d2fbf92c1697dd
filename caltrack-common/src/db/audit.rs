//! Outbound audit log on `email_log`

use async_trait::async_trait;
use chrono::NaiveDate;

use super::SqliteStore;
use crate::models::{NotificationEvent, TenantId};
use crate::store::AuditSink;
use crate::time::format_date;
use crate::Result;

#[async_trait]
impl AuditSink for SqliteStore {
    async fn record(&self, event: &NotificationEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO email_log
            (company_id, direction, tier, from_address, to_address, subject,
             body_text, status, dedup_key, sent_on, created_at)
            VALUES (?, 'outbound', ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.tenant_id)
        .bind(event.tier.as_str())
        .bind(&event.sender)
        .bind(event.recipients.join(", "))
        .bind(&event.subject)
        .bind(&event.body)
        .bind(event.outcome.as_str())
        .bind(event.dedup_key.as_deref())
        .bind(format_date(event.sent_on))
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn was_sent(&self, tenant: TenantId, dedup_key: &str, on: NaiveDate) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM email_log
            WHERE company_id = ? AND dedup_key = ? AND sent_on = ? AND status = 'sent'
            "#,
        )
        .bind(tenant)
        .bind(dedup_key)
        .bind(format_date(on))
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}
