//! Enhancement record storage trait and types.

use thiserror::Error;

use super::{EnhancementRecord, EnhancementStatus};

/// Error type for record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Filter for querying enhancement records.
#[derive(Debug, Clone, Default)]
pub struct EnhancementFilter {
    /// Filter by tenant.
    pub tenant_id: Option<String>,
    /// Filter by lifecycle status.
    pub status: Option<EnhancementStatus>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl EnhancementFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            tenant_id: None,
            status: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_status(mut self, status: EnhancementStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for enhancement record storage backends.
///
/// There is exactly one write path: [`EnhancementStore::upsert`], an
/// insert-or-update keyed solely on `(tenant_id, ticket_id)`.
pub trait EnhancementStore: Send + Sync {
    /// Get the record for a key.
    fn get(&self, tenant_id: &str, ticket_id: &str)
        -> Result<Option<EnhancementRecord>, StoreError>;

    /// Insert the record, or replace the existing row for the same key.
    ///
    /// `created_at` of an existing row is never overwritten.
    fn upsert(&self, record: &EnhancementRecord) -> Result<(), StoreError>;

    /// List records matching the filter, most recently updated first.
    fn list(&self, filter: &EnhancementFilter) -> Result<Vec<EnhancementRecord>, StoreError>;

    /// Count records matching the filter.
    fn count(&self, filter: &EnhancementFilter) -> Result<i64, StoreError>;
}
