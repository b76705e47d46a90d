//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the in-process router
//! over a real SQLite store and queue, with the ticketing tool and tenant
//! lookup replaced by mocks. The dispatcher is not started; tests drive it
//! one job at a time with `process_next`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use enhancer_core::{
    testing::{MockTenantProvider, MockTicketingClient},
    Config, DatabaseConfig, Dispatcher, Orchestrator, SqliteEnhancementStore, SqliteJobQueue,
    TenantConfig, TicketingClient, ToolRegistry,
};
use enhancer_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use enhancer_core::testing::fixtures;

/// Test fixture with mock dependencies.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Worker pool, not started
    pub dispatcher: Arc<Dispatcher>,
    /// Mock ticketing tool behind the `http_json` tool type
    pub ticketing: Arc<MockTicketingClient>,
    /// Mock tenant lookup
    pub tenants: Arc<MockTenantProvider>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture with the `acme` tenant registered.
    pub fn new() -> Self {
        Self::with_tenants(vec![fixtures::tenant("acme")])
    }

    pub fn with_tenants(tenants: Vec<TenantConfig>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            tenants: tenants.clone(),
            ..Default::default()
        };

        let store = Arc::new(SqliteEnhancementStore::new(&db_path).expect("Failed to create store"));
        let queue = Arc::new(SqliteJobQueue::new(&db_path).expect("Failed to create queue"));
        let tenant_provider = Arc::new(MockTenantProvider::new(tenants));
        let ticketing = Arc::new(MockTicketingClient::new());

        let client = Arc::clone(&ticketing);
        let mut tools = ToolRegistry::new();
        tools.register("http_json", move |_| {
            Ok(Arc::clone(&client) as Arc<dyn TicketingClient>)
        });

        let orchestrator = Arc::new(Orchestrator::new(
            config.orchestrator.clone(),
            store.clone(),
            Arc::new(tools),
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            config.dispatcher.clone(),
            queue,
            tenant_provider.clone(),
            orchestrator,
        ));

        let state = Arc::new(AppState::new(config, store, Arc::clone(&dispatcher)));
        let router = create_router(state);

        Self {
            router,
            dispatcher,
            ticketing,
            tenants: tenant_provider,
            temp_dir,
        }
    }

    /// Process every queued job.
    pub async fn drain_queue(&self) -> usize {
        let mut processed = 0;
        while self
            .dispatcher
            .process_next()
            .await
            .expect("Failed to process job")
        {
            processed += 1;
        }
        processed
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
