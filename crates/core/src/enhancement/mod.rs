//! Enhancement records: the durable lifecycle state of each
//! `(tenant_id, ticket_id)` enhancement attempt.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteEnhancementStore;
pub use store::{EnhancementFilter, EnhancementStore, StoreError};
pub use types::{EnhancementRecord, EnhancementRequest, EnhancementStatus};
