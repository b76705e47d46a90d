//! Mock tenant provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::tenant::{TenantConfig, TenantConfigProvider, TenantError};

/// Tenant provider whose lookups can be made to fail.
///
/// A queued error is returned by the next lookup only; after that the
/// provider answers from its tenant map again. An error set with
/// [`MockTenantProvider::fail_always`] is returned until cleared.
#[derive(Debug, Default)]
pub struct MockTenantProvider {
    tenants: Mutex<HashMap<String, Arc<TenantConfig>>>,
    errors: Mutex<Vec<TenantError>>,
    outage: Mutex<Option<TenantError>>,
    lookups: AtomicUsize,
}

impl MockTenantProvider {
    pub fn new(tenants: impl IntoIterator<Item = TenantConfig>) -> Self {
        let provider = Self::default();
        for tenant in tenants {
            provider.insert(tenant);
        }
        provider
    }

    pub fn insert(&self, tenant: TenantConfig) {
        self.tenants
            .lock()
            .unwrap()
            .insert(tenant.tenant_id.clone(), Arc::new(tenant));
    }

    /// Fail the next lookup with `error`.
    pub fn fail_next(&self, error: TenantError) {
        self.errors.lock().unwrap().push(error);
    }

    /// Fail every lookup with `error`, or stop failing with `None`.
    pub fn fail_always(&self, error: Option<TenantError>) {
        *self.outage.lock().unwrap() = error;
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TenantConfigProvider for MockTenantProvider {
    async fn get(&self, tenant_id: &str) -> Result<Arc<TenantConfig>, TenantError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.errors.lock().unwrap().pop() {
            return Err(error);
        }
        if let Some(error) = self.outage.lock().unwrap().clone() {
            return Err(error);
        }

        self.tenants
            .lock()
            .unwrap()
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| TenantError::NotFound(tenant_id.to_string()))
    }
}
