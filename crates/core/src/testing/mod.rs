//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam of the pipeline (gatherers, the model
//! endpoint, ticketing tools, tenant lookup), so the orchestrator and the
//! dispatcher can be exercised end to end without real services.
//!
//! # Example
//!
//! ```rust,ignore
//! use enhancer_core::testing::{fixtures, MockGatherer, MockTicketingClient};
//!
//! let history = Arc::new(MockGatherer::new("history", fixtures::history_result()));
//! let ticketing = Arc::new(MockTicketingClient::new());
//! ticketing.push_status(503);
//! ```

mod mock_gatherer;
mod mock_llm;
mod mock_tenants;
mod mock_ticketing;

pub use mock_gatherer::MockGatherer;
pub use mock_llm::MockLlmClient;
pub use mock_tenants::MockTenantProvider;
pub use mock_ticketing::{MockTicketingClient, RecordedUpdate};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::enhancement::EnhancementRequest;
    use crate::gatherer::{
        AssetItem, ContextValue, DocumentItem, GatherRequest, GatherResult, GatheredContext,
        HistoryItem,
    };
    use crate::tenant::{GathererEndpoint, TenantConfig, TenantPreferences, TicketingEndpoint};

    /// A valid `http_json` tenant with no gatherer endpoints.
    pub fn tenant(tenant_id: &str) -> TenantConfig {
        TenantConfig {
            tenant_id: tenant_id.to_string(),
            tool_type: "http_json".to_string(),
            enabled: true,
            ticketing: TicketingEndpoint {
                base_url: format!("https://tickets.{}.test", tenant_id),
                api_key: None,
            },
            gatherers: HashMap::new(),
            preferences: TenantPreferences::default(),
        }
    }

    /// A tenant with gatherer endpoints pointing at a closed local port.
    pub fn tenant_with_gatherers(tenant_id: &str, names: &[&str]) -> TenantConfig {
        let mut tenant = tenant(tenant_id);
        for name in names {
            tenant.gatherers.insert(
                name.to_string(),
                GathererEndpoint {
                    url: format!("http://127.0.0.1:9/{}", name),
                    api_key: None,
                },
            );
        }
        tenant
    }

    /// A gather request expiring `budget` from now.
    pub fn gather_request(tenant: TenantConfig, budget: Duration) -> GatherRequest {
        GatherRequest {
            tenant: Arc::new(tenant),
            correlation_id: "corr-test".to_string(),
            ticket_text: "VPN drops every hour\n\nThe client disconnects on the office wifi."
                .to_string(),
            deadline: Instant::now() + budget,
        }
    }

    /// An enhancement request with a fixed correlation id.
    pub fn request(tenant_id: &str, ticket_id: &str) -> EnhancementRequest {
        EnhancementRequest::new(
            tenant_id,
            ticket_id,
            "VPN drops every hour",
            "The client disconnects on the office wifi.",
        )
        .with_correlation_id(format!("corr-{}-{}", tenant_id, ticket_id))
        .with_priority("high")
    }

    pub fn history_result() -> GatherResult {
        GatherResult::ok(ContextValue::History {
            items: vec![HistoryItem {
                ticket_id: "T-100".to_string(),
                subject: "VPN disconnects on wifi".to_string(),
                resolution: Some("Upgraded the VPN client to 5.2".to_string()),
                similarity: 0.92,
            }],
        })
    }

    pub fn documents_result() -> GatherResult {
        GatherResult::ok(ContextValue::Documents {
            items: vec![DocumentItem {
                title: "VPN troubleshooting guide".to_string(),
                url: Some("https://kb.test/vpn".to_string()),
                snippet: Some("Check the client version first.".to_string()),
                score: 0.8,
            }],
        })
    }

    pub fn assets_result() -> GatherResult {
        GatherResult::ok(ContextValue::Assets {
            items: vec![AssetItem {
                asset_id: "A-7".to_string(),
                name: "Laptop LT-0042".to_string(),
                kind: Some("laptop".to_string()),
                owner: Some("j.doe".to_string()),
                status: Some("active".to_string()),
            }],
        })
    }

    /// Context where every default gatherer succeeded.
    pub fn full_context() -> GatheredContext {
        let mut context = GatheredContext::new();
        context.insert("history", history_result());
        context.insert("documents", documents_result());
        context.insert("assets", assets_result());
        context
    }
}
