//! Tenant configuration lookup.

mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use types::{
    GathererEndpoint, TenantConfig, TenantError, TenantPreferences, TicketingEndpoint,
};

/// Source of per-tenant configuration (credentials, endpoints, tool type).
#[async_trait]
pub trait TenantConfigProvider: Send + Sync {
    /// Resolve the configuration for a tenant.
    async fn get(&self, tenant_id: &str) -> Result<Arc<TenantConfig>, TenantError>;
}

/// Provider backed by the `[[tenants]]` section of the config file.
#[derive(Debug, Default)]
pub struct StaticTenantProvider {
    tenants: HashMap<String, Arc<TenantConfig>>,
}

impl StaticTenantProvider {
    pub fn new(tenants: impl IntoIterator<Item = TenantConfig>) -> Self {
        Self {
            tenants: tenants
                .into_iter()
                .map(|t| (t.tenant_id.clone(), Arc::new(t)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[async_trait]
impl TenantConfigProvider for StaticTenantProvider {
    async fn get(&self, tenant_id: &str) -> Result<Arc<TenantConfig>, TenantError> {
        let tenant = self
            .tenants
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| TenantError::NotFound(tenant_id.to_string()))?;
        tenant.validate()?;
        Ok(tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_get_known_tenant() {
        let provider = StaticTenantProvider::new(vec![fixtures::tenant("acme")]);
        let tenant = provider.get("acme").await.unwrap();
        assert_eq!(tenant.tenant_id, "acme");
    }

    #[tokio::test]
    async fn test_get_unknown_tenant() {
        let provider = StaticTenantProvider::new(vec![fixtures::tenant("acme")]);
        let err = provider.get("globex").await.unwrap_err();
        assert_eq!(err, TenantError::NotFound("globex".to_string()));
    }

    #[tokio::test]
    async fn test_get_invalid_tenant() {
        let mut tenant = fixtures::tenant("acme");
        tenant.tool_type = String::new();
        let provider = StaticTenantProvider::new(vec![tenant]);
        assert!(matches!(
            provider.get("acme").await,
            Err(TenantError::Invalid { .. })
        ));
    }
}
