//! Mock ticketing client for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::updater::{TicketUpdate, TicketingClient, TicketingError};

/// A recorded ticket update for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    pub tenant_id: String,
    pub ticket_id: String,
    pub correlation_id: String,
    pub text: String,
}

/// Mock implementation of the TicketingClient trait.
///
/// Each call is recorded, then answered from a script of outcomes. When the
/// script is empty the call succeeds.
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTicketingClient::new();
/// client.push_status(503);
/// client.push_status(503);
/// // third call succeeds
/// ```
#[derive(Debug, Default)]
pub struct MockTicketingClient {
    script: Mutex<VecDeque<Result<(), TicketingError>>>,
    delay: Mutex<Option<Duration>>,
    delay_once: Mutex<Option<Duration>>,
    updates: Mutex<Vec<RecordedUpdate>>,
}

impl MockTicketingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the HTTP status for the next unscripted call. 2xx succeeds.
    pub fn push_status(&self, status: u16) {
        let outcome = if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(TicketingError::Http {
                status,
                message: format!("mock status {}", status),
            })
        };
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Queue an arbitrary error.
    pub fn push_error(&self, error: TicketingError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Delay every call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Delay only the next call.
    pub fn set_delay_once(&self, delay: Duration) {
        *self.delay_once.lock().unwrap() = Some(delay);
    }

    pub fn call_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn recorded_updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketingClient for MockTicketingClient {
    fn tool_type(&self) -> &str {
        "mock"
    }

    async fn update_ticket(&self, update: TicketUpdate<'_>) -> Result<(), TicketingError> {
        self.updates.lock().unwrap().push(RecordedUpdate {
            tenant_id: update.tenant_id.to_string(),
            ticket_id: update.ticket_id.to_string(),
            correlation_id: update.correlation_id.to_string(),
            text: update.text.to_string(),
        });

        let once = self.delay_once.lock().unwrap().take();
        let delay = once.or(*self.delay.lock().unwrap());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}
