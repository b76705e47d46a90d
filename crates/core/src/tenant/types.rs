//! Tenant configuration types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by tenant configuration lookups.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TenantError {
    #[error("tenant '{0}' not found")]
    NotFound(String),

    #[error("tenant '{tenant_id}' is invalid: {reason}")]
    Invalid { tenant_id: String, reason: String },

    #[error("tenant configuration unavailable: {0}")]
    Unavailable(String),
}

/// Ticketing system connection for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketingEndpoint {
    /// Base URL of the ticketing API.
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Backing service for one gatherer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GathererEndpoint {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Per-tenant tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TenantPreferences {
    /// Word budget for synthesized text. Can only lower the global cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_words: Option<usize>,
}

/// Everything the pipeline needs to know about one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenantConfig {
    pub tenant_id: String,
    /// Ticketing tool type, resolved through the tool router.
    pub tool_type: String,
    /// A disabled tenant is treated as a configuration error.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub ticketing: TicketingEndpoint,
    /// Gatherer name -> backing endpoint.
    #[serde(default)]
    pub gatherers: HashMap<String, GathererEndpoint>,
    #[serde(default)]
    pub preferences: TenantPreferences,
}

fn default_enabled() -> bool {
    true
}

impl TenantConfig {
    /// Check that the tenant can be used by the pipeline.
    pub fn validate(&self) -> Result<(), TenantError> {
        let invalid = |reason: &str| TenantError::Invalid {
            tenant_id: self.tenant_id.clone(),
            reason: reason.to_string(),
        };

        if self.tenant_id.trim().is_empty() {
            return Err(invalid("tenant_id cannot be empty"));
        }
        if self.tool_type.trim().is_empty() {
            return Err(invalid("tool_type cannot be empty"));
        }
        if self.ticketing.base_url.trim().is_empty() {
            return Err(invalid("ticketing.base_url cannot be empty"));
        }
        if let Some(name) = self
            .gatherers
            .iter()
            .find(|(_, endpoint)| endpoint.url.trim().is_empty())
            .map(|(name, _)| name)
        {
            return Err(invalid(&format!("gatherer '{}' has an empty url", name)));
        }
        if self.preferences.max_words == Some(0) {
            return Err(invalid("preferences.max_words must be greater than 0"));
        }

        Ok(())
    }
}
