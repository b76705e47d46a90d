//! Similar-ticket history gatherer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::{endpoint, post_json};
use super::{ContextValue, GatherError, GatherRequest, GatherResult, Gatherer, HistoryItem};

#[derive(Debug, Serialize)]
struct HistoryQuery<'a> {
    tenant_id: &'a str,
    ticket_text: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    items: Vec<HistoryItem>,
}

/// Looks up resolved tickets similar to the current one.
///
/// POSTs `{tenant_id, ticket_text, limit}` to the tenant's `history`
/// endpoint and expects `{"items": [HistoryItem]}` back.
pub struct HistoryGatherer {
    client: reqwest::Client,
    limit: usize,
}

impl HistoryGatherer {
    pub const NAME: &'static str = "history";

    pub fn new(limit: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            limit,
        }
    }

    async fn fetch(&self, request: &GatherRequest) -> Result<Vec<HistoryItem>, GatherError> {
        let endpoint = endpoint(request, Self::NAME)?;
        let query = HistoryQuery {
            tenant_id: request.tenant_id(),
            ticket_text: &request.ticket_text,
            limit: self.limit,
        };

        let response: HistoryResponse = post_json(
            &self.client,
            endpoint,
            &query,
            request,
        )
        .await?;

        let mut items = response.items;
        items.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        items.truncate(self.limit);
        Ok(items)
    }
}

#[async_trait]
impl Gatherer for HistoryGatherer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn gather(&self, request: &GatherRequest) -> GatherResult {
        match self.fetch(request).await {
            Ok(items) => GatherResult::ok(ContextValue::History { items }),
            Err(e) => e.into(),
        }
    }
}
