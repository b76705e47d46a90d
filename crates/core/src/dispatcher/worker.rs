//! Dispatcher implementation: a fixed pool of workers pulling one job at a time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::enhancement::EnhancementStatus;
use crate::orchestrator::Orchestrator;
use crate::tenant::{TenantConfigProvider, TenantError};

use super::config::DispatcherConfig;
use super::queue::{JobQueue, QueueError};

/// Current status of the dispatcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatcherStatus {
    /// Whether workers are running.
    pub running: bool,
    /// Configured worker pool size.
    pub workers: usize,
    /// Jobs not yet acknowledged.
    pub queue_depth: u64,
    /// Jobs that reached a terminal record and were acknowledged.
    pub processed: u64,
    /// Acknowledged jobs whose record ended `failed`.
    pub failed: u64,
    /// Jobs given back to the queue for redelivery.
    pub released: u64,
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    failed: AtomicU64,
    released: AtomicU64,
}

/// What one pass over the queue did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Nothing was available.
    Idle,
    /// A job reached a terminal record and was acknowledged.
    Acked,
    /// A job was given back to the queue.
    Released,
}

/// State shared by every worker.
struct Shared {
    config: DispatcherConfig,
    queue: Arc<dyn JobQueue>,
    tenants: Arc<dyn TenantConfigProvider>,
    orchestrator: Arc<Orchestrator>,
    counters: Counters,
}

/// Pulls jobs from the queue and hands them to the orchestrator.
///
/// A job is acknowledged only after the orchestrator returns a terminal
/// record. If the record store fails the job is released and handed out
/// again once the configured retry delay has passed.
pub struct Dispatcher {
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        queue: Arc<dyn JobQueue>,
        tenants: Arc<dyn TenantConfigProvider>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            shared: Arc::new(Shared {
                config,
                queue,
                tenants,
                orchestrator,
                counters: Counters::default(),
            }),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.shared.queue
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn the worker pool.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Dispatcher already running");
            return;
        }

        let workers = self.shared.config.workers.max(1);
        info!(workers, "Starting dispatcher");

        let mut handles = self.handles.lock().unwrap();
        for worker_id in 0..workers {
            handles.push(self.spawn_worker(worker_id));
        }
    }

    /// Stop the worker pool. In-flight jobs run to completion first.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Dispatcher not running");
            return;
        }

        info!("Stopping dispatcher");
        let _ = self.shutdown_tx.send(());

        let handles: Vec<JoinHandle<()>> = self.handles.lock().unwrap().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Dispatcher worker panicked");
            }
        }

        info!("Dispatcher stopped");
    }

    /// Process at most one job. Returns `Ok(false)` if the queue had nothing
    /// available, `Ok(true)` if a job was acknowledged or released.
    pub async fn process_next(&self) -> Result<bool, QueueError> {
        Ok(Self::process_one(&self.shared).await? != Outcome::Idle)
    }

    /// Current status of the dispatcher.
    pub async fn status(&self) -> DispatcherStatus {
        let queue_depth = match self.shared.queue.depth().await {
            Ok(depth) => depth,
            Err(e) => {
                warn!(error = %e, "Failed to read queue depth");
                0
            }
        };
        let counters = &self.shared.counters;

        DispatcherStatus {
            running: self.is_running(),
            workers: self.shared.config.workers,
            queue_depth,
            processed: counters.processed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            released: counters.released.load(Ordering::Relaxed),
        }
    }

    fn spawn_worker(&self, worker_id: usize) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            debug!(worker_id, "Dispatcher worker started");
            loop {
                if !running.load(Ordering::Relaxed) {
                    break;
                }

                // Shutdown is only observed between jobs. Only an acked job
                // lets the worker go straight back to the queue.
                match Self::process_one(&shared).await {
                    Ok(Outcome::Acked) => continue,
                    Ok(Outcome::Idle | Outcome::Released) => {}
                    Err(e) => warn!(worker_id, error = %e, "Queue error"),
                }

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!(worker_id, "Dispatcher worker received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(shared.config.poll_interval()) => {}
                }
            }
            debug!(worker_id, "Dispatcher worker stopped");
        })
    }

    async fn process_one(shared: &Shared) -> Result<Outcome, QueueError> {
        let Some(job) = shared.queue.receive(shared.config.lease()).await? else {
            return Ok(Outcome::Idle);
        };

        let request = &job.request;
        debug!(
            job_id = %job.job_id,
            correlation_id = %request.correlation_id,
            tenant_id = %request.tenant_id,
            ticket_id = %request.ticket_id,
            deliveries = job.deliveries,
            "Received job"
        );

        let tenant = shared.tenants.get(&request.tenant_id).await;
        if let Err(TenantError::Unavailable(ref reason)) = tenant {
            // Provider outage says nothing about the tenant itself; try again later.
            warn!(
                job_id = %job.job_id,
                correlation_id = %request.correlation_id,
                tenant_id = %request.tenant_id,
                error = %reason,
                retry_delay_ms = shared.config.retry_delay_ms,
                "Tenant configuration unavailable, releasing job"
            );
            shared
                .queue
                .release(&job.job_id, shared.config.retry_delay())
                .await?;
            shared.counters.released.fetch_add(1, Ordering::Relaxed);
            return Ok(Outcome::Released);
        }

        match shared.orchestrator.enhance(request, tenant).await {
            Ok(record) => {
                shared.queue.ack(&job.job_id).await?;
                shared.counters.processed.fetch_add(1, Ordering::Relaxed);
                if record.status == EnhancementStatus::Failed {
                    shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Outcome::Acked)
            }
            Err(e) => {
                error!(
                    job_id = %job.job_id,
                    correlation_id = %request.correlation_id,
                    tenant_id = %request.tenant_id,
                    ticket_id = %request.ticket_id,
                    error = %e,
                    retry_delay_ms = shared.config.retry_delay_ms,
                    "Enhancement aborted, releasing job"
                );
                shared
                    .queue
                    .release(&job.job_id, shared.config.retry_delay())
                    .await?;
                shared.counters.released.fetch_add(1, Ordering::Relaxed);
                Ok(Outcome::Released)
            }
        }
    }
}
