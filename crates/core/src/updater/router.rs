//! Tool type -> ticketing client resolution.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::client::TicketingClient;
use super::http_client::HttpTicketingClient;
use crate::tenant::TenantConfig;

/// Errors resolving a ticketing client. Always a configuration error.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouterError {
    #[error("unknown tool type '{0}'")]
    UnknownTool(String),

    #[error("invalid configuration for tool '{tool_type}': {reason}")]
    InvalidConfig { tool_type: String, reason: String },
}

/// Resolves the ticketing client for a tenant.
pub trait ToolRouter: Send + Sync {
    fn client_for(&self, tenant: &TenantConfig) -> Result<Arc<dyn TicketingClient>, RouterError>;
}

/// Builds a client from the tenant's ticketing settings.
pub type ClientFactory =
    Box<dyn Fn(&TenantConfig) -> Result<Arc<dyn TicketingClient>, RouterError> + Send + Sync>;

/// Injected registry of client factories keyed by tool type.
pub struct ToolRegistry {
    factories: HashMap<String, ClientFactory>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the reference `http_json` client registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(HttpTicketingClient::TOOL_TYPE, |tenant| {
            let base_url = tenant.ticketing.base_url.trim();
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(RouterError::InvalidConfig {
                    tool_type: HttpTicketingClient::TOOL_TYPE.to_string(),
                    reason: format!("base_url '{}' is not an http(s) URL", base_url),
                });
            }
            Ok(Arc::new(HttpTicketingClient::new(
                base_url,
                tenant.ticketing.api_key.clone(),
            )) as Arc<dyn TicketingClient>)
        });
        registry
    }

    /// Register (or replace) the factory for a tool type.
    pub fn register<F>(&mut self, tool_type: impl Into<String>, factory: F)
    where
        F: Fn(&TenantConfig) -> Result<Arc<dyn TicketingClient>, RouterError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(tool_type.into(), Box::new(factory));
    }

    /// Registered tool types, sorted.
    pub fn tool_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ToolRouter for ToolRegistry {
    fn client_for(&self, tenant: &TenantConfig) -> Result<Arc<dyn TicketingClient>, RouterError> {
        let factory = self
            .factories
            .get(&tenant.tool_type)
            .ok_or_else(|| RouterError::UnknownTool(tenant.tool_type.clone()))?;
        factory(tenant)
    }
}
