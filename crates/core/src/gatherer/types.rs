//! Gatherer data types.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::tenant::TenantConfig;

/// Errors raised inside a gatherer. These never cross the gatherer
/// boundary; they are folded into a [`GatherResult`].
#[derive(Debug, Error)]
pub enum GatherError {
    #[error("no endpoint configured for gatherer '{0}'")]
    NotConfigured(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("deadline reached")]
    Timeout,

    #[error("unknown gatherer '{0}'")]
    UnknownGatherer(String),
}

/// Input handed to every gatherer for one enhancement attempt.
#[derive(Debug, Clone)]
pub struct GatherRequest {
    /// Resolved tenant configuration (endpoints and credentials).
    pub tenant: Arc<TenantConfig>,
    /// Correlation id of the enhancement attempt.
    pub correlation_id: String,
    /// Ticket subject and description.
    pub ticket_text: String,
    /// The gatherer must return by this instant.
    pub deadline: Instant,
}

impl GatherRequest {
    pub fn tenant_id(&self) -> &str {
        &self.tenant.tenant_id
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Outcome status of one gatherer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatherStatus {
    Ok,
    Timeout,
    Error,
}

/// A resolved ticket similar to the one being enhanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub ticket_id: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Similarity to the current ticket (0.0-1.0).
    #[serde(default)]
    pub similarity: f32,
}

/// A knowledge-base document matched against the ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default)]
    pub score: f32,
}

/// An asset (device, account, service) related to the ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetItem {
    pub asset_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Typed value produced by a gatherer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextValue {
    History { items: Vec<HistoryItem> },
    Documents { items: Vec<DocumentItem> },
    Assets { items: Vec<AssetItem> },
    /// Free-form value from a custom gatherer.
    Custom { data: serde_json::Value },
}

impl ContextValue {
    /// True if the value carries no items.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::History { items } => items.is_empty(),
            Self::Documents { items } => items.is_empty(),
            Self::Assets { items } => items.is_empty(),
            Self::Custom { data } => data.is_null(),
        }
    }
}

/// Result of one gatherer invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatherResult {
    pub status: GatherStatus,
    pub value: Option<ContextValue>,
    pub error_detail: Option<String>,
}

impl GatherResult {
    pub fn ok(value: ContextValue) -> Self {
        Self {
            status: GatherStatus::Ok,
            value: Some(value),
            error_detail: None,
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self {
            status: GatherStatus::Timeout,
            value: None,
            error_detail: Some(detail.into()),
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: GatherStatus::Error,
            value: None,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == GatherStatus::Ok
    }
}

impl From<GatherError> for GatherResult {
    fn from(err: GatherError) -> Self {
        match err {
            GatherError::Timeout => Self::timeout(err.to_string()),
            other => Self::error(other.to_string()),
        }
    }
}

/// Aggregated results of all gatherers for one attempt, keyed by gatherer name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatheredContext {
    entries: BTreeMap<String, GatherResult>,
}

impl GatheredContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result for a gatherer, replacing any earlier entry.
    pub fn insert(&mut self, name: impl Into<String>, result: GatherResult) {
        self.entries.insert(name.into(), result);
    }

    pub fn get(&self, name: &str) -> Option<&GatherResult> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GatherResult)> {
        self.entries.iter().map(|(name, result)| (name.as_str(), result))
    }

    /// True iff at least one entry did not succeed.
    pub fn is_partial(&self) -> bool {
        self.entries.values().any(|r| !r.is_ok())
    }

    /// Names of gatherers whose entry is not `ok`.
    pub fn unavailable(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, r)| !r.is_ok())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// All history items across successful entries.
    pub fn history(&self) -> Vec<&HistoryItem> {
        self.values()
            .filter_map(|v| match v {
                ContextValue::History { items } => Some(items.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// All document items across successful entries.
    pub fn documents(&self) -> Vec<&DocumentItem> {
        self.values()
            .filter_map(|v| match v {
                ContextValue::Documents { items } => Some(items.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// All asset items across successful entries.
    pub fn assets(&self) -> Vec<&AssetItem> {
        self.values()
            .filter_map(|v| match v {
                ContextValue::Assets { items } => Some(items.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn values(&self) -> impl Iterator<Item = &ContextValue> {
        self.entries
            .values()
            .filter(|r| r.is_ok())
            .filter_map(|r| r.value.as_ref())
    }
}
