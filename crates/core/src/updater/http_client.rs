//! Reference ticketing client speaking plain JSON over HTTP.

use async_trait::async_trait;
use serde::Serialize;

use super::client::{TicketUpdate, TicketingClient, TicketingError};
use crate::gatherer::CORRELATION_HEADER;

/// Adds an internal comment via `POST {base_url}/tickets/{ticket_id}/comments`.
pub struct HttpTicketingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTicketingClient {
    pub const TOOL_TYPE: &'static str = "http_json";

    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn comments_url(&self, ticket_id: &str) -> String {
        format!(
            "{}/tickets/{}/comments",
            self.base_url,
            urlencoding::encode(ticket_id)
        )
    }
}

#[derive(Debug, Serialize)]
struct CommentBody<'a> {
    body: &'a str,
    internal: bool,
    source: &'static str,
}

#[async_trait]
impl TicketingClient for HttpTicketingClient {
    fn tool_type(&self) -> &str {
        Self::TOOL_TYPE
    }

    async fn update_ticket(&self, update: TicketUpdate<'_>) -> Result<(), TicketingError> {
        let mut builder = self
            .client
            .post(self.comments_url(update.ticket_id))
            .header(CORRELATION_HEADER, update.correlation_id)
            .header("x-tenant-id", update.tenant_id)
            .json(&CommentBody {
                body: update.text,
                internal: true,
                source: "enhancer",
            });

        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TicketingError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(TicketingError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_url_encodes_ticket_id() {
        let client = HttpTicketingClient::new("https://tickets.acme.test/api/", None);
        assert_eq!(
            client.comments_url("INC 42/a"),
            "https://tickets.acme.test/api/tickets/INC%2042%2Fa/comments"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient() {
        let client = HttpTicketingClient::new("http://127.0.0.1:9", None);
        let err = client
            .update_ticket(TicketUpdate {
                tenant_id: "acme",
                ticket_id: "T-1",
                correlation_id: "c-1",
                text: "note",
            })
            .await
            .unwrap_err();

        assert!(matches!(err, TicketingError::Network(_)));
        assert!(err.is_transient());
    }
}
