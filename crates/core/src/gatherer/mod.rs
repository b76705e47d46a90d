//! Context gatherers.
//!
//! A gatherer is one independent source of evidence about a ticket (similar
//! past tickets, knowledge-base documents, related assets). Gatherers know
//! nothing about each other; the orchestrator runs them concurrently, each
//! under its own deadline, and aggregates whatever they return into a
//! [`GatheredContext`].

mod assets;
mod config;
mod documents;
mod history;
mod http;
mod types;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

pub use assets::AssetGatherer;
pub use config::GatherersConfig;
pub use documents::DocumentGatherer;
pub use history::HistoryGatherer;
pub use http::CORRELATION_HEADER;
pub use types::{
    AssetItem, ContextValue, DocumentItem, GatherError, GatherRequest, GatherResult,
    GatherStatus, GatheredContext, HistoryItem,
};

/// A single context source.
///
/// Implementations must return by `request.deadline` and must not panic or
/// propagate errors: every failure is reported as a [`GatherResult`] with
/// status `error` or `timeout`.
#[async_trait]
pub trait Gatherer: Send + Sync {
    /// Unique name; the key of this gatherer's entry in [`GatheredContext`].
    fn name(&self) -> &str;

    /// Gather context for one ticket.
    async fn gather(&self, request: &GatherRequest) -> GatherResult;
}

/// Build the reference gatherers named in `config.enabled`.
pub fn build_gatherers(config: &GatherersConfig) -> Result<Vec<Arc<dyn Gatherer>>, GatherError> {
    let mut seen = HashSet::new();
    let mut gatherers: Vec<Arc<dyn Gatherer>> = Vec::new();

    for name in &config.enabled {
        if !seen.insert(name.as_str()) {
            continue;
        }
        let gatherer: Arc<dyn Gatherer> = match name.as_str() {
            HistoryGatherer::NAME => Arc::new(HistoryGatherer::new(config.history_limit)),
            DocumentGatherer::NAME => Arc::new(DocumentGatherer::new(config.document_limit)),
            AssetGatherer::NAME => Arc::new(AssetGatherer::new(config.asset_limit)),
            other => return Err(GatherError::UnknownGatherer(other.to_string())),
        };
        gatherers.push(gatherer);
    }

    Ok(gatherers)
}
