//! Dispatcher integration tests.
//!
//! These tests verify the queue -> worker -> orchestrator -> ack flow,
//! including redelivery of released jobs and worker pool start/stop.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use enhancer_core::{
    testing::{fixtures, MockTenantProvider, MockTicketingClient},
    Dispatcher, DispatcherConfig, EnhancementFilter, EnhancementStatus, EnhancementStore,
    JobQueue, Orchestrator, OrchestratorConfig, SqliteEnhancementStore, SqliteJobQueue,
    TenantConfigProvider, TenantError, TicketingClient, ToolRegistry,
};

struct TestHarness {
    store: Arc<SqliteEnhancementStore>,
    queue: Arc<SqliteJobQueue>,
    tenants: Arc<MockTenantProvider>,
    ticketing: Arc<MockTicketingClient>,
    orchestrator: Arc<Orchestrator>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let store = Arc::new(SqliteEnhancementStore::new(&db_path).expect("Failed to create store"));
        let queue = Arc::new(SqliteJobQueue::new(&db_path).expect("Failed to create queue"));
        let tenants = Arc::new(MockTenantProvider::new(vec![fixtures::tenant("acme")]));
        let ticketing = Arc::new(MockTicketingClient::new());

        let client = Arc::clone(&ticketing);
        let mut router = ToolRegistry::new();
        router.register("http_json", move |_| {
            Ok(Arc::clone(&client) as Arc<dyn TicketingClient>)
        });

        let orchestrator = Arc::new(Orchestrator::new(
            OrchestratorConfig { deadline_ms: 5_000 },
            store.clone(),
            Arc::new(router),
        ));

        Self {
            store,
            queue,
            tenants,
            ticketing,
            orchestrator,
            temp_dir,
        }
    }

    fn dispatcher(&self, workers: usize) -> Dispatcher {
        self.dispatcher_with_retry_delay(workers, 0)
    }

    fn dispatcher_with_retry_delay(&self, workers: usize, retry_delay_ms: u64) -> Dispatcher {
        Dispatcher::new(
            DispatcherConfig {
                enabled: true,
                workers,
                poll_interval_ms: 20,
                lease_secs: 30,
                retry_delay_ms,
            },
            self.queue.clone(),
            self.tenants.clone(),
            self.orchestrator.clone(),
        )
    }

    fn status_of(&self, ticket_id: &str) -> Option<EnhancementStatus> {
        self.store
            .get("acme", ticket_id)
            .unwrap()
            .map(|record| record.status)
    }
}

#[tokio::test]
async fn test_job_is_processed_and_acked() {
    let harness = TestHarness::new();
    let dispatcher = harness.dispatcher(1);

    harness
        .queue
        .enqueue(&fixtures::request("acme", "T-1"))
        .await
        .unwrap();

    assert!(dispatcher.process_next().await.unwrap());
    assert!(!dispatcher.process_next().await.unwrap());

    assert_eq!(harness.status_of("T-1"), Some(EnhancementStatus::Completed));
    assert_eq!(harness.ticketing.call_count(), 1);

    let status = dispatcher.status().await;
    assert_eq!(status.queue_depth, 0);
    assert_eq!(status.processed, 1);
    assert_eq!(status.failed, 0);
    assert_eq!(status.released, 0);
}

#[tokio::test]
async fn test_failed_record_is_still_acked() {
    let harness = TestHarness::new();
    let dispatcher = harness.dispatcher(1);

    harness
        .queue
        .enqueue(&fixtures::request("globex", "T-1"))
        .await
        .unwrap();

    assert!(dispatcher.process_next().await.unwrap());

    let record = harness.store.get("globex", "T-1").unwrap().unwrap();
    assert_eq!(record.status, EnhancementStatus::Failed);
    assert_eq!(harness.ticketing.call_count(), 0);

    let status = dispatcher.status().await;
    assert_eq!(status.queue_depth, 0);
    assert_eq!(status.processed, 1);
    assert_eq!(status.failed, 1);
}

#[tokio::test]
async fn test_unavailable_tenant_config_releases_job() {
    let harness = TestHarness::new();
    let dispatcher = harness.dispatcher(1);
    harness
        .tenants
        .fail_next(TenantError::Unavailable("config service down".to_string()));

    harness
        .queue
        .enqueue(&fixtures::request("acme", "T-2"))
        .await
        .unwrap();

    assert!(dispatcher.process_next().await.unwrap());
    assert_eq!(harness.status_of("T-2"), None);
    assert_eq!(dispatcher.status().await.released, 1);
    assert_eq!(harness.queue.depth().await.unwrap(), 1);

    // Redelivered and processed once the provider recovers.
    assert!(dispatcher.process_next().await.unwrap());
    assert_eq!(harness.status_of("T-2"), Some(EnhancementStatus::Completed));
    assert_eq!(harness.queue.depth().await.unwrap(), 0);
    assert_eq!(harness.tenants.lookup_count(), 2);
}

#[tokio::test]
async fn test_released_job_waits_for_retry_delay() {
    let harness = TestHarness::new();
    let dispatcher = harness.dispatcher_with_retry_delay(1, 10_000);
    harness
        .tenants
        .fail_next(TenantError::Unavailable("config service down".to_string()));

    harness
        .queue
        .enqueue(&fixtures::request("acme", "T-4"))
        .await
        .unwrap();

    assert!(dispatcher.process_next().await.unwrap());
    // Still queued, but not handed out again yet.
    assert!(!dispatcher.process_next().await.unwrap());
    assert_eq!(harness.queue.depth().await.unwrap(), 1);
    assert_eq!(harness.tenants.lookup_count(), 1);
}

#[tokio::test]
async fn test_tenant_outage_does_not_spin_workers() {
    let harness = TestHarness::new();
    let dispatcher = harness.dispatcher(1);
    harness
        .tenants
        .fail_always(Some(TenantError::Unavailable("config service down".to_string())));

    harness
        .queue
        .enqueue(&fixtures::request("acme", "T-5"))
        .await
        .unwrap();

    dispatcher.start();
    tokio::time::sleep(Duration::from_millis(200)).await;
    tokio::time::timeout(Duration::from_secs(2), dispatcher.stop())
        .await
        .expect("stop did not return");

    // One lookup per poll interval at most, not a busy loop.
    let lookups = harness.tenants.lookup_count();
    assert!(lookups >= 1);
    assert!(lookups <= 15, "worker spun: {} lookups", lookups);

    let status = dispatcher.status().await;
    assert_eq!(status.released as usize, lookups);
    assert_eq!(status.processed, 0);
    assert_eq!(status.queue_depth, 1);
    assert_eq!(harness.status_of("T-5"), None);
}

#[tokio::test]
async fn test_store_outage_release_does_not_spin_workers() {
    let harness = TestHarness::new();
    let dispatcher = harness.dispatcher(1);
    // Record store becomes unusable; the queue table is untouched.
    rusqlite::Connection::open(harness.temp_dir.path().join("test.db"))
        .unwrap()
        .execute_batch("DROP TABLE enhancements;")
        .unwrap();

    harness
        .queue
        .enqueue(&fixtures::request("acme", "T-6"))
        .await
        .unwrap();

    dispatcher.start();
    tokio::time::sleep(Duration::from_millis(200)).await;
    tokio::time::timeout(Duration::from_secs(2), dispatcher.stop())
        .await
        .expect("stop did not return");

    let status = dispatcher.status().await;
    assert!(status.released >= 1);
    assert!(status.released <= 15, "worker spun: {} releases", status.released);
    assert_eq!(status.processed, 0);
}

#[tokio::test]
async fn test_redelivery_after_lost_ack_is_idempotent() {
    let harness = TestHarness::new();
    let dispatcher = harness.dispatcher(1);
    let request = fixtures::request("acme", "T-3").with_correlation_id("c-3");

    // First delivery completes but the ack never happens.
    let tenant = harness.tenants.get("acme").await;
    let first = harness.orchestrator.enhance(&request, tenant).await.unwrap();
    assert_eq!(first.status, EnhancementStatus::Completed);

    harness.queue.enqueue(&request).await.unwrap();
    assert!(dispatcher.process_next().await.unwrap());

    assert_eq!(harness.ticketing.call_count(), 1);
    let record = harness.store.get("acme", "T-3").unwrap().unwrap();
    assert_eq!(record, first);
    assert_eq!(harness.queue.depth().await.unwrap(), 0);
}

#[tokio::test]
async fn test_worker_pool_drains_queue() {
    let harness = TestHarness::new();
    let dispatcher = harness.dispatcher(3);

    for i in 0..6 {
        harness
            .queue
            .enqueue(&fixtures::request("acme", &format!("T-{}", i)))
            .await
            .unwrap();
    }

    dispatcher.start();
    assert!(dispatcher.is_running());

    let completed = EnhancementFilter::new().with_status(EnhancementStatus::Completed);
    let mut drained = false;
    for _ in 0..100 {
        if harness.store.count(&completed).unwrap() == 6 {
            drained = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    dispatcher.stop().await;

    assert!(drained, "queue was not drained");
    assert!(!dispatcher.is_running());
    assert_eq!(harness.ticketing.call_count(), 6);

    let status = dispatcher.status().await;
    assert!(!status.running);
    assert_eq!(status.workers, 3);
    assert_eq!(status.queue_depth, 0);
    assert_eq!(status.processed, 6);
}

#[tokio::test]
async fn test_start_twice_and_stop_when_idle() {
    let harness = TestHarness::new();
    let dispatcher = harness.dispatcher(2);

    dispatcher.start();
    dispatcher.start();
    assert!(dispatcher.is_running());

    tokio::time::timeout(Duration::from_secs(2), dispatcher.stop())
        .await
        .expect("stop did not return");
    assert!(!dispatcher.is_running());

    // Stopping again is a no-op.
    dispatcher.stop().await;
}
