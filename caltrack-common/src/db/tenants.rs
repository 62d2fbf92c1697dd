//! Tenant directory over `companies` and `tenant_routing`

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::warn;

use super::SqliteStore;
use crate::models::{Route, Tenant, TenantId, Tier, TierRouting};
use crate::store::TenantDirectory;
use crate::Result;

#[async_trait]
impl TenantDirectory for SqliteStore {
    async fn list_active_tenants(&self) -> Result<Vec<Tenant>> {
        self.load_tenants(false).await
    }

    async fn list_onboarded_tenants(&self) -> Result<Vec<Tenant>> {
        self.load_tenants(true).await
    }
}

impl SqliteStore {
    async fn load_tenants(&self, onboarded_only: bool) -> Result<Vec<Tenant>> {
        let companies: Vec<(i64, String, String, bool)> = sqlx::query_as(
            r#"
            SELECT id, slug, name, onboarded FROM companies
            WHERE is_active = 1 AND (onboarded = 1 OR ? = 0)
            ORDER BY id
            "#,
        )
        .bind(onboarded_only)
        .fetch_all(&self.pool)
        .await?;

        let routes: Vec<(i64, String, String, Option<String>)> = sqlx::query_as(
            "SELECT company_id, tier, recipients, subject_template FROM tenant_routing ORDER BY company_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut routing: HashMap<TenantId, TierRouting> = HashMap::new();
        for (company_id, tier, recipients, subject_template) in routes {
            let tier: Tier = match tier.parse() {
                Ok(tier) => tier,
                Err(e) => {
                    warn!(company_id, "Ignoring routing row: {}", e);
                    continue;
                }
            };
            routing.entry(company_id).or_default().insert(
                tier,
                Route {
                    recipients: split_recipients(&recipients),
                    subject_template: subject_template.filter(|s| !s.trim().is_empty()),
                },
            );
        }

        Ok(companies
            .into_iter()
            .map(|(id, slug, name, onboarded)| Tenant {
                id,
                sender: self.sender_for(&slug, &name),
                slug,
                name,
                onboarded,
                routing: routing.remove(&id).unwrap_or_default(),
            })
            .collect())
    }

    pub async fn insert_company(&self, slug: &str, name: &str, onboarded: bool) -> Result<TenantId> {
        let result = sqlx::query("INSERT INTO companies (slug, name, onboarded) VALUES (?, ?, ?)")
            .bind(slug)
            .bind(name)
            .bind(onboarded)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Create or replace the route for one tier
    pub async fn set_route(
        &self,
        tenant: TenantId,
        tier: Tier,
        recipients: &[&str],
        subject_template: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_routing (company_id, tier, recipients, subject_template)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (company_id, tier)
            DO UPDATE SET recipients = excluded.recipients, subject_template = excluded.subject_template
            "#,
        )
        .bind(tenant)
        .bind(tier.as_str())
        .bind(recipients.join(","))
        .bind(subject_template)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn split_recipients(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::split_recipients;

    #[test]
    fn test_split_recipients_trims_and_drops_blanks() {
        assert_eq!(
            split_recipients(" qa@acme.test, ,lab@acme.test;buyer@acme.test "),
            vec!["qa@acme.test", "lab@acme.test", "buyer@acme.test"]
        );
        assert!(split_recipients("").is_empty());
    }
}
