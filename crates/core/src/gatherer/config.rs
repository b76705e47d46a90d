//! Gatherer configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the `[gatherers]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatherersConfig {
    /// Per-gatherer budget in milliseconds, independent of siblings.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Names of the reference gatherers to register.
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,
    /// Maximum similar tickets returned by `history`.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Maximum documents returned by `documents`.
    #[serde(default = "default_document_limit")]
    pub document_limit: usize,
    /// Maximum assets returned by `assets`.
    #[serde(default = "default_asset_limit")]
    pub asset_limit: usize,
}

fn default_timeout_ms() -> u64 {
    12_000
}

fn default_enabled() -> Vec<String> {
    vec![
        "history".to_string(),
        "documents".to_string(),
        "assets".to_string(),
    ]
}

fn default_history_limit() -> usize {
    5
}

fn default_document_limit() -> usize {
    5
}

fn default_asset_limit() -> usize {
    10
}

impl Default for GatherersConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            enabled: default_enabled(),
            history_limit: default_history_limit(),
            document_limit: default_document_limit(),
            asset_limit: default_asset_limit(),
        }
    }
}
