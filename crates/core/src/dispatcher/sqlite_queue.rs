//! SQLite-backed job queue.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::error;

use super::{JobQueue, QueueError, QueuedJob};
use crate::enhancement::EnhancementRequest;

/// SQLite-backed job queue with lease-based redelivery.
pub struct SqliteJobQueue {
    conn: Mutex<Connection>,
}

impl SqliteJobQueue {
    /// Open (or create) the queue at `path`.
    pub fn new(path: &Path) -> Result<Self, QueueError> {
        let conn = Connection::open(path).map_err(|e| QueueError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory queue (useful for testing).
    pub fn in_memory() -> Result<Self, QueueError> {
        let conn =
            Connection::open_in_memory().map_err(|e| QueueError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), QueueError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS enhancement_jobs (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL UNIQUE,
                tenant_id TEXT NOT NULL,
                ticket_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                deliveries INTEGER NOT NULL DEFAULT 0,
                leased_until INTEGER,
                enqueued_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_enhancement_jobs_lease ON enhancement_jobs(leased_until);

            CREATE TABLE IF NOT EXISTS enhancement_dead_jobs (
                job_id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                ticket_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                deliveries INTEGER NOT NULL,
                reason TEXT NOT NULL,
                failed_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;

        Ok(())
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Number of jobs set aside because their payload could not be decoded.
    pub fn dead_letter_count(&self) -> Result<u64, QueueError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM enhancement_dead_jobs", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as u64)
        .map_err(|e| QueueError::Database(e.to_string()))
    }

    /// Move a job out of the queue into the dead-letter table.
    fn dead_letter(conn: &Connection, job_id: &str, reason: &str) -> Result<(), QueueError> {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| QueueError::Database(e.to_string()))?;
        tx.execute(
            "INSERT OR REPLACE INTO enhancement_dead_jobs
                 (job_id, tenant_id, ticket_id, payload, deliveries, reason, failed_at)
             SELECT job_id, tenant_id, ticket_id, payload, deliveries, ?2, ?3
             FROM enhancement_jobs WHERE job_id = ?1",
            params![job_id, reason, Utc::now().to_rfc3339()],
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;
        tx.execute(
            "DELETE FROM enhancement_jobs WHERE job_id = ?",
            params![job_id],
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;
        tx.commit()
            .map_err(|e| QueueError::Database(e.to_string()))
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, request: &EnhancementRequest) -> Result<String, QueueError> {
        let payload =
            serde_json::to_string(request).map_err(|e| QueueError::Serialization(e.to_string()))?;
        let job_id = uuid::Uuid::new_v4().to_string();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO enhancement_jobs (job_id, tenant_id, ticket_id, payload, enqueued_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                job_id,
                request.tenant_id,
                request.ticket_id,
                payload,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;

        Ok(job_id)
    }

    async fn receive(&self, lease: Duration) -> Result<Option<QueuedJob>, QueueError> {
        let now = Self::now_millis();
        let leased_until = now + lease.as_millis() as i64;

        let conn = self.conn.lock().unwrap();
        loop {
            // Single statement: claim and return the oldest available job.
            let row = conn
                .query_row(
                    "UPDATE enhancement_jobs
                     SET leased_until = ?1, deliveries = deliveries + 1
                     WHERE seq = (
                         SELECT seq FROM enhancement_jobs
                         WHERE leased_until IS NULL OR leased_until <= ?2
                         ORDER BY seq ASC
                         LIMIT 1
                     )
                     RETURNING job_id, payload, deliveries, enqueued_at",
                    params![leased_until, now],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, u32>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| QueueError::Database(e.to_string()))?;

            let Some((job_id, payload, deliveries, enqueued_at)) = row else {
                return Ok(None);
            };

            let request: EnhancementRequest = match serde_json::from_str(&payload) {
                Ok(request) => request,
                Err(e) => {
                    // Never handed out, so never acked: set it aside.
                    error!(
                        job_id = %job_id,
                        deliveries,
                        error = %e,
                        "Undecodable job payload, moving to dead letters"
                    );
                    Self::dead_letter(&conn, &job_id, &e.to_string())?;
                    continue;
                }
            };
            let enqueued_at = DateTime::parse_from_rfc3339(&enqueued_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());

            return Ok(Some(QueuedJob {
                job_id,
                request,
                deliveries,
                enqueued_at,
            }));
        }
    }

    async fn ack(&self, job_id: &str) -> Result<(), QueueError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute(
                "DELETE FROM enhancement_jobs WHERE job_id = ?",
                params![job_id],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        if deleted == 0 {
            return Err(QueueError::NotFound(job_id.to_string()));
        }
        Ok(())
    }

    async fn release(&self, job_id: &str, retry_after: Duration) -> Result<(), QueueError> {
        let available_at = Self::now_millis() + retry_after.as_millis() as i64;

        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE enhancement_jobs SET leased_until = ? WHERE job_id = ?",
                params![available_at, job_id],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(QueueError::NotFound(job_id.to_string()));
        }
        Ok(())
    }

    async fn depth(&self) -> Result<u64, QueueError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM enhancement_jobs", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as u64)
        .map_err(|e| QueueError::Database(e.to_string()))
    }
}
