//! Asset inventory gatherer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::{endpoint, post_json};
use super::{AssetItem, ContextValue, GatherError, GatherRequest, GatherResult, Gatherer};

#[derive(Debug, Serialize)]
struct AssetQuery<'a> {
    tenant_id: &'a str,
    ticket_text: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    #[serde(default)]
    assets: Vec<AssetItem>,
}

/// Looks up assets (devices, accounts, services) mentioned by the ticket.
pub struct AssetGatherer {
    client: reqwest::Client,
    limit: usize,
}

impl AssetGatherer {
    pub const NAME: &'static str = "assets";

    pub fn new(limit: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            limit,
        }
    }

    async fn fetch(&self, request: &GatherRequest) -> Result<Vec<AssetItem>, GatherError> {
        let endpoint = endpoint(request, Self::NAME)?;
        let query = AssetQuery {
            tenant_id: request.tenant_id(),
            ticket_text: &request.ticket_text,
            limit: self.limit,
        };

        let response: AssetResponse = post_json(
            &self.client,
            endpoint,
            &query,
            request,
        )
        .await?;

        let mut assets = response.assets;
        assets.truncate(self.limit);
        Ok(assets)
    }
}

#[async_trait]
impl Gatherer for AssetGatherer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn gather(&self, request: &GatherRequest) -> GatherResult {
        match self.fetch(request).await {
            Ok(items) => GatherResult::ok(ContextValue::Assets { items }),
            Err(e) => e.into(),
        }
    }
}
