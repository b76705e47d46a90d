//! Mock gatherer for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::gatherer::{GatherRequest, GatherResult, Gatherer};

/// Mock implementation of the Gatherer trait.
///
/// Returns a fixed result after an optional delay. The delay ignores the
/// request deadline so tests can check that the caller enforces it.
///
/// # Example
///
/// ```rust,ignore
/// use enhancer_core::testing::{fixtures, MockGatherer};
///
/// let history = Arc::new(MockGatherer::new("history", fixtures::history_result()));
/// let slow = Arc::new(MockGatherer::new("assets", fixtures::assets_result())
///     .with_delay(Duration::from_secs(30)));
/// ```
#[derive(Debug)]
pub struct MockGatherer {
    name: String,
    result: Mutex<GatherResult>,
    delay: Mutex<Option<Duration>>,
    panics: AtomicBool,
    calls: AtomicUsize,
    deadlines: Mutex<Vec<Instant>>,
}

impl MockGatherer {
    /// Create a mock that returns `result` immediately.
    pub fn new(name: impl Into<String>, result: GatherResult) -> Self {
        Self {
            name: name.into(),
            result: Mutex::new(result),
            delay: Mutex::new(None),
            panics: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            deadlines: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock whose gather task panics.
    pub fn panicking(name: impl Into<String>) -> Self {
        let gatherer = Self::new(name, GatherResult::error("unreachable"));
        gatherer.panics.store(true, Ordering::SeqCst);
        gatherer
    }

    /// Sleep before returning.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(delay);
        self
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn set_result(&self, result: GatherResult) {
        *self.result.lock().unwrap() = result;
    }

    /// Number of times `gather` was called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Deadlines received, in call order.
    pub fn received_deadlines(&self) -> Vec<Instant> {
        self.deadlines.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gatherer for MockGatherer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn gather(&self, request: &GatherRequest) -> GatherResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.deadlines.lock().unwrap().push(request.deadline);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.panics.load(Ordering::SeqCst) {
            panic!("mock gatherer '{}' panicked", self.name);
        }

        self.result.lock().unwrap().clone()
    }
}
