//! # Tenant quota lookup.
//!
//! Quotas are owned by the authentication collaborator; this core only reads
//! them. [`QuotaSource`] is the seam: the surrounding system implements it
//! against whatever stores its API keys, and the registry resolves the quota
//! **per job at admission time**, so quota changes take effect on the next
//! submission without a restart.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

/// Per-tenant limits consulted at admission time.
///
/// Unset fields fall back to the orchestrator defaults
/// (see [`OrchestratorConfig`](crate::OrchestratorConfig)).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantQuota {
    /// Maximum concurrently running jobs for the tenant.
    pub max_concurrent: Option<usize>,
    /// Wall-clock runtime limit per job (`None` = unlimited).
    pub max_runtime: Option<Duration>,
}

/// Read-only lookup of a tenant's quota.
#[async_trait]
pub trait QuotaSource: Send + Sync + 'static {
    /// Returns the quota for the tenant; `TenantQuota::default()` when the
    /// tenant has no explicit limits configured.
    async fn quota(&self, tenant_id: &str) -> TenantQuota;
}

/// Fixed in-memory quota table.
///
/// Suitable for embedders with static configuration, and for tests.
#[derive(Debug, Default)]
pub struct StaticQuotas {
    quotas: HashMap<String, TenantQuota>,
}

impl StaticQuotas {
    /// Creates an empty table (every tenant gets the defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the quota for one tenant.
    pub fn with(mut self, tenant_id: impl Into<String>, quota: TenantQuota) -> Self {
        self.quotas.insert(tenant_id.into(), quota);
        self
    }
}

#[async_trait]
impl QuotaSource for StaticQuotas {
    async fn quota(&self, tenant_id: &str) -> TenantQuota {
        self.quotas.get(tenant_id).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_tenant_gets_defaults() {
        let quotas = StaticQuotas::new();
        let q = quotas.quota("nobody").await;
        assert_eq!(q, TenantQuota::default());
        assert!(q.max_concurrent.is_none());
    }

    #[tokio::test]
    async fn configured_tenant_gets_its_limits() {
        let quotas = StaticQuotas::new().with(
            "key-1",
            TenantQuota {
                max_concurrent: Some(2),
                max_runtime: Some(Duration::from_secs(60)),
            },
        );
        let q = quotas.quota("key-1").await;
        assert_eq!(q.max_concurrent, Some(2));
        assert_eq!(q.max_runtime, Some(Duration::from_secs(60)));
    }
}
