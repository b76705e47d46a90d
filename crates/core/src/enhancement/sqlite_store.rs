//! SQLite-backed enhancement record store.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{EnhancementFilter, EnhancementRecord, EnhancementStatus, EnhancementStore, StoreError};
use crate::gatherer::GatheredContext;
use crate::synthesizer::{SynthesisResult, SynthesisSource};

const SELECT_COLUMNS: &str = "tenant_id, ticket_id, status, correlation_id, partial_context, \
     synthesis_source, error_message, attempts, update_attempts, context, synthesis, \
     created_at, updated_at, completed_at";

/// SQLite-backed enhancement record store.
pub struct SqliteEnhancementStore {
    conn: Mutex<Connection>,
}

impl SqliteEnhancementStore {
    /// Create a new store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS enhancements (
                tenant_id TEXT NOT NULL,
                ticket_id TEXT NOT NULL,
                status TEXT NOT NULL,
                correlation_id TEXT NOT NULL,
                partial_context INTEGER NOT NULL DEFAULT 0,
                synthesis_source TEXT,
                error_message TEXT,
                attempts INTEGER NOT NULL DEFAULT 0,
                update_attempts INTEGER NOT NULL DEFAULT 0,
                context TEXT,
                synthesis TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT,
                PRIMARY KEY (tenant_id, ticket_id)
            );

            CREATE INDEX IF NOT EXISTS idx_enhancements_status ON enhancements(status);
            CREATE INDEX IF NOT EXISTS idx_enhancements_updated_at ON enhancements(updated_at);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn build_where_clause(filter: &EnhancementFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref tenant_id) = filter.tenant_id {
            conditions.push("tenant_id = ?");
            params.push(Box::new(tenant_id.clone()));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<EnhancementRecord> {
        let status_str: String = row.get(2)?;
        let source_str: Option<String> = row.get(5)?;
        let context_json: Option<String> = row.get(9)?;
        let synthesis_json: Option<String> = row.get(10)?;
        let created_at: String = row.get(11)?;
        let updated_at: String = row.get(12)?;
        let completed_at: Option<String> = row.get(13)?;

        // An unknown status can only come from a newer schema; surface it as failed
        // rather than silently resuming it.
        let status = EnhancementStatus::parse(&status_str).unwrap_or(EnhancementStatus::Failed);

        let context: Option<GatheredContext> =
            context_json.and_then(|json| serde_json::from_str(&json).ok());
        let synthesis: Option<SynthesisResult> =
            synthesis_json.and_then(|json| serde_json::from_str(&json).ok());

        Ok(EnhancementRecord {
            tenant_id: row.get(0)?,
            ticket_id: row.get(1)?,
            status,
            correlation_id: row.get(3)?,
            partial_context: row.get::<_, i64>(4)? != 0,
            synthesis_source: source_str.as_deref().and_then(SynthesisSource::parse),
            error_message: row.get(6)?,
            attempts: row.get(7)?,
            update_attempts: row.get(8)?,
            context,
            synthesis,
            created_at: Self::parse_timestamp(&created_at),
            updated_at: Self::parse_timestamp(&updated_at),
            completed_at: completed_at.as_deref().map(Self::parse_timestamp),
        })
    }
}

impl EnhancementStore for SqliteEnhancementStore {
    fn get(
        &self,
        tenant_id: &str,
        ticket_id: &str,
    ) -> Result<Option<EnhancementRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!(
                "SELECT {} FROM enhancements WHERE tenant_id = ? AND ticket_id = ?",
                SELECT_COLUMNS
            ),
            params![tenant_id, ticket_id],
            Self::row_to_record,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    fn upsert(&self, record: &EnhancementRecord) -> Result<(), StoreError> {
        let context_json = record
            .context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let synthesis_json = record
            .synthesis
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO enhancements (tenant_id, ticket_id, status, correlation_id, partial_context,
                synthesis_source, error_message, attempts, update_attempts, context, synthesis,
                created_at, updated_at, completed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(tenant_id, ticket_id) DO UPDATE SET
                status = excluded.status,
                correlation_id = excluded.correlation_id,
                partial_context = excluded.partial_context,
                synthesis_source = excluded.synthesis_source,
                error_message = excluded.error_message,
                attempts = excluded.attempts,
                update_attempts = excluded.update_attempts,
                context = excluded.context,
                synthesis = excluded.synthesis,
                updated_at = excluded.updated_at,
                completed_at = excluded.completed_at",
            params![
                record.tenant_id,
                record.ticket_id,
                record.status.as_str(),
                record.correlation_id,
                record.partial_context as i64,
                record.synthesis_source.map(|s| s.as_str()),
                record.error_message,
                record.attempts,
                record.update_attempts,
                context_json,
                synthesis_json,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
                record.completed_at.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn list(&self, filter: &EnhancementFilter) -> Result<Vec<EnhancementRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM enhancements {} ORDER BY updated_at DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_record)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            records.push(row_result.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        Ok(records)
    }

    fn count(&self, filter: &EnhancementFilter) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM enhancements {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancement::EnhancementRequest;
    use crate::gatherer::{GatherResult, GatheredContext};

    fn create_test_store() -> SqliteEnhancementStore {
        SqliteEnhancementStore::in_memory().unwrap()
    }

    fn create_test_request(tenant: &str, ticket: &str) -> EnhancementRequest {
        EnhancementRequest::new(tenant, ticket, "Outlook crashes", "Crashes on start")
            .with_correlation_id(format!("corr-{}-{}", tenant, ticket))
    }

    #[test]
    fn test_upsert_and_get() {
        let store = create_test_store();
        let record = EnhancementRecord::accept(&create_test_request("acme", "T-1"), None);

        store.upsert(&record).unwrap();
        let fetched = store.get("acme", "T-1").unwrap().unwrap();

        assert_eq!(fetched.tenant_id, "acme");
        assert_eq!(fetched.ticket_id, "T-1");
        assert_eq!(fetched.status, EnhancementStatus::Pending);
        assert_eq!(fetched.correlation_id, "corr-acme-T-1");
        assert_eq!(fetched.attempts, 1);
    }

    #[test]
    fn test_get_missing_record() {
        let store = create_test_store();
        assert!(store.get("acme", "nope").unwrap().is_none());
    }

    #[test]
    fn test_upsert_same_key_updates_in_place() {
        let store = create_test_store();
        let request = create_test_request("acme", "T-1");
        let first = EnhancementRecord::accept(&request, None);
        store.upsert(&first).unwrap();

        let mut second = EnhancementRecord::accept(&request.with_correlation_id("c-2"), Some(&first));
        second.status = EnhancementStatus::Failed;
        second.error_message = Some("deadline_exceeded".to_string());
        store.upsert(&second).unwrap();

        assert_eq!(store.count(&EnhancementFilter::new()).unwrap(), 1);

        let fetched = store.get("acme", "T-1").unwrap().unwrap();
        assert_eq!(fetched.status, EnhancementStatus::Failed);
        assert_eq!(fetched.correlation_id, "c-2");
        assert_eq!(fetched.attempts, 2);
        assert_eq!(fetched.error_message.as_deref(), Some("deadline_exceeded"));
    }

    #[test]
    fn test_upsert_never_overwrites_created_at() {
        let store = create_test_store();
        let request = create_test_request("acme", "T-1");
        let first = EnhancementRecord::accept(&request, None);
        store.upsert(&first).unwrap();

        let mut rewritten = first.clone();
        rewritten.created_at = Utc::now() + chrono::Duration::days(1);
        store.upsert(&rewritten).unwrap();

        let fetched = store.get("acme", "T-1").unwrap().unwrap();
        assert_eq!(fetched.created_at.timestamp(), first.created_at.timestamp());
    }

    #[test]
    fn test_same_ticket_id_different_tenants_are_separate() {
        let store = create_test_store();
        store
            .upsert(&EnhancementRecord::accept(&create_test_request("acme", "T-1"), None))
            .unwrap();
        store
            .upsert(&EnhancementRecord::accept(&create_test_request("globex", "T-1"), None))
            .unwrap();

        assert_eq!(store.count(&EnhancementFilter::new()).unwrap(), 2);
        assert_eq!(
            store.get("globex", "T-1").unwrap().unwrap().correlation_id,
            "corr-globex-T-1"
        );
    }

    #[test]
    fn test_context_and_synthesis_persisted() {
        let store = create_test_store();
        let mut record = EnhancementRecord::accept(&create_test_request("acme", "T-1"), None);

        let mut context = GatheredContext::new();
        context.insert("history", GatherResult::timeout("exceeded 12s"));
        record.set_context(context);
        record.set_synthesis(SynthesisResult::fallback("Check the VPN client logs.".to_string(), 500));
        record.status = EnhancementStatus::Failed;
        record.completed_at = None;
        store.upsert(&record).unwrap();

        let fetched = store.get("acme", "T-1").unwrap().unwrap();
        assert!(fetched.partial_context);
        assert_eq!(fetched.synthesis_source, Some(SynthesisSource::Fallback));
        let context = fetched.context.unwrap();
        assert_eq!(context.len(), 1);
        assert!(context.is_partial());
        assert_eq!(fetched.synthesis.unwrap().word_count, 5);
    }

    #[test]
    fn test_list_with_filters() {
        let store = create_test_store();
        for ticket in ["T-1", "T-2", "T-3"] {
            store
                .upsert(&EnhancementRecord::accept(&create_test_request("acme", ticket), None))
                .unwrap();
        }
        let mut done = EnhancementRecord::accept(&create_test_request("globex", "T-9"), None);
        done.status = EnhancementStatus::Completed;
        done.completed_at = Some(Utc::now());
        store.upsert(&done).unwrap();

        let acme = store.list(&EnhancementFilter::new().with_tenant("acme")).unwrap();
        assert_eq!(acme.len(), 3);

        let completed = store
            .list(&EnhancementFilter::new().with_status(EnhancementStatus::Completed))
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].tenant_id, "globex");
        assert!(completed[0].completed_at.is_some());

        let page = store
            .list(&EnhancementFilter::new().with_limit(2).with_offset(2))
            .unwrap();
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("enhancer.db");

        {
            let store = SqliteEnhancementStore::new(&db_path).unwrap();
            store
                .upsert(&EnhancementRecord::accept(&create_test_request("acme", "T-1"), None))
                .unwrap();
        }

        assert!(db_path.exists());
        let reopened = SqliteEnhancementStore::new(&db_path).unwrap();
        assert!(reopened.get("acme", "T-1").unwrap().is_some());
    }
}
