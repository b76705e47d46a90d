//! Mock model client for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::synthesizer::{LlmClient, LlmError, ModelPrompt};

/// Mock implementation of the LlmClient trait.
///
/// Returns a configurable completion, optionally after a delay, or a
/// configured error on every call.
#[derive(Debug)]
pub struct MockLlmClient {
    response: Mutex<String>,
    delay: Mutex<Option<Duration>>,
    error: Mutex<Option<LlmError>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<ModelPrompt>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            response: Mutex::new("Mock enhancement.".to_string()),
            delay: Mutex::new(None),
            error: Mutex::new(None),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Set the completion text.
    pub fn set_response(&self, text: &str) {
        *self.response.lock().unwrap() = text.to_string();
    }

    /// Sleep before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Fail every call with `error`.
    pub fn set_error(&self, error: LlmError) {
        *self.error.lock().unwrap() = Some(error);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    pub fn recorded_prompts(&self) -> Vec<ModelPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, prompt: &ModelPrompt) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.error.lock().unwrap().clone() {
            return Err(error);
        }

        Ok(self.response.lock().unwrap().clone())
    }
}
