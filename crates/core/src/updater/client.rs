//! Ticketing client abstraction.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Error returned by a ticketing client call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TicketingError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TicketingError {
    /// Network failures, timeouts and 5xx responses are worth retrying.
    /// Every other status (401, 403, 404, other 4xx) is final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => (500..600).contains(status),
            Self::InvalidResponse(_) => false,
        }
    }
}

/// One write against a tenant's ticketing system.
#[derive(Debug, Clone, Copy)]
pub struct TicketUpdate<'a> {
    pub tenant_id: &'a str,
    pub ticket_id: &'a str,
    pub correlation_id: &'a str,
    /// Enhancement text to attach to the ticket.
    pub text: &'a str,
}

/// Client for one ticketing tool.
#[async_trait]
pub trait TicketingClient: Send + Sync {
    /// Tool type this client serves (e.g. "http_json").
    fn tool_type(&self) -> &str;

    /// Attach the enhancement text to the ticket.
    async fn update_ticket(&self, update: TicketUpdate<'_>) -> Result<(), TicketingError>;
}
