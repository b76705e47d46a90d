//! Durable job queue abstraction.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enhancement::EnhancementRequest;

/// Error type for queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Job not found: {0}")]
    NotFound(String),
}

/// A job handed to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: String,
    pub request: EnhancementRequest,
    /// How many times this job has been handed out, including this one.
    pub deliveries: u32,
    pub enqueued_at: DateTime<Utc>,
}

/// At-least-once job queue.
///
/// A received job is leased to the receiver. It stays in the queue until
/// acknowledged; if the lease expires first (the worker died) it is
/// delivered again.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a request to the queue. Returns the job id.
    async fn enqueue(&self, request: &EnhancementRequest) -> Result<String, QueueError>;

    /// Lease the oldest available job, if any.
    async fn receive(&self, lease: Duration) -> Result<Option<QueuedJob>, QueueError>;

    /// Remove a job after it reached a terminal outcome.
    async fn ack(&self, job_id: &str) -> Result<(), QueueError>;

    /// Give a job back. It becomes available again after `retry_after`.
    async fn release(&self, job_id: &str, retry_after: Duration) -> Result<(), QueueError>;

    /// Number of jobs not yet acknowledged (leased or not).
    async fn depth(&self) -> Result<u64, QueueError>;
}
