//! Knowledge-base document search gatherer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::{endpoint, post_json};
use super::{ContextValue, DocumentItem, GatherError, GatherRequest, GatherResult, Gatherer};

#[derive(Debug, Serialize)]
struct DocumentQuery<'a> {
    tenant_id: &'a str,
    query: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    #[serde(default)]
    documents: Vec<DocumentItem>,
}

/// Searches the tenant's knowledge base for documents matching the ticket.
pub struct DocumentGatherer {
    client: reqwest::Client,
    limit: usize,
}

impl DocumentGatherer {
    pub const NAME: &'static str = "documents";

    pub fn new(limit: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            limit,
        }
    }

    async fn fetch(&self, request: &GatherRequest) -> Result<Vec<DocumentItem>, GatherError> {
        let endpoint = endpoint(request, Self::NAME)?;
        let query = DocumentQuery {
            tenant_id: request.tenant_id(),
            query: &request.ticket_text,
            limit: self.limit,
        };

        let response: DocumentResponse = post_json(
            &self.client,
            endpoint,
            &query,
            request,
        )
        .await?;

        let mut documents = response.documents;
        documents.sort_by(|a, b| b.score.total_cmp(&a.score));
        documents.truncate(self.limit);
        Ok(documents)
    }
}

#[async_trait]
impl Gatherer for DocumentGatherer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn gather(&self, request: &GatherRequest) -> GatherResult {
        match self.fetch(request).await {
            Ok(items) => GatherResult::ok(ContextValue::Documents { items }),
            Err(e) => e.into(),
        }
    }
}
