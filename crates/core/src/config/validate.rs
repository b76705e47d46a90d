use std::collections::HashSet;

use super::{types::Config, ConfigError};
use crate::gatherer::{AssetGatherer, DocumentGatherer, HistoryGatherer};

const KNOWN_GATHERERS: [&str; 3] = [
    HistoryGatherer::NAME,
    DocumentGatherer::NAME,
    AssetGatherer::NAME,
];

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Time budgets are non-zero and nest inside the hard deadline
/// - Synthesizer, updater and dispatcher settings
/// - Gatherer names and tenant entries
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    let deadline_ms = config.orchestrator.deadline_ms;
    if deadline_ms == 0 {
        return Err(invalid("orchestrator.deadline_ms must be greater than 0"));
    }

    if config.gatherers.timeout_ms == 0 || config.gatherers.timeout_ms >= deadline_ms {
        return Err(invalid(format!(
            "gatherers.timeout_ms must be between 1 and orchestrator.deadline_ms ({}), got {}",
            deadline_ms, config.gatherers.timeout_ms
        )));
    }
    for name in &config.gatherers.enabled {
        if !KNOWN_GATHERERS.contains(&name.as_str()) {
            return Err(invalid(format!(
                "gatherers.enabled: unknown gatherer '{}' (known: {})",
                name,
                KNOWN_GATHERERS.join(", ")
            )));
        }
    }

    config
        .synthesizer
        .validate()
        .map_err(|e| invalid(format!("synthesizer: {}", e)))?;
    if config.synthesizer.timeout_ms >= deadline_ms {
        return Err(invalid(format!(
            "synthesizer.timeout_ms ({}) must be below orchestrator.deadline_ms ({})",
            config.synthesizer.timeout_ms, deadline_ms
        )));
    }

    config
        .updater
        .validate()
        .map_err(|e| invalid(format!("updater: {}", e)))?;

    if config.dispatcher.workers == 0 {
        return Err(invalid("dispatcher.workers must be at least 1"));
    }
    if config.dispatcher.lease_secs.saturating_mul(1000) <= deadline_ms {
        return Err(invalid(format!(
            "dispatcher.lease_secs ({}) must exceed orchestrator.deadline_ms ({})",
            config.dispatcher.lease_secs, deadline_ms
        )));
    }

    let mut seen = HashSet::new();
    for tenant in &config.tenants {
        if !seen.insert(tenant.tenant_id.as_str()) {
            return Err(invalid(format!("duplicate tenant '{}'", tenant.tenant_id)));
        }
        tenant.validate().map_err(|e| invalid(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use tokio_test::{assert_err, assert_ok};

    const TENANT: &str = r#"
[[tenants]]
tenant_id = "acme"
tool_type = "http_json"

[tenants.ticketing]
base_url = "https://tickets.acme.test"
"#;

    #[test]
    fn test_validate_default_config() {
        assert_ok!(validate_config(&Config::default()));
    }

    #[test]
    fn test_validate_config_with_tenant() {
        let config = load_config_from_str(TENANT).unwrap();
        assert_ok!(validate_config(&config));
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_gatherer_budget_must_fit_deadline() {
        let mut config = Config::default();
        config.orchestrator.deadline_ms = 10_000;
        config.gatherers.timeout_ms = 12_000;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("gatherers.timeout_ms"));
    }

    #[test]
    fn test_synthesis_budget_must_fit_deadline() {
        let mut config = Config::default();
        config.orchestrator.deadline_ms = 20_000;
        config.gatherers.timeout_ms = 5_000;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("synthesizer.timeout_ms"));
    }

    #[test]
    fn test_unknown_gatherer_fails() {
        let mut config = Config::default();
        config.gatherers.enabled.push("tarot".to_string());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("tarot"));
    }

    #[test]
    fn test_lease_must_exceed_deadline() {
        let mut config = Config::default();
        config.dispatcher.lease_secs = 60;
        assert_err!(validate_config(&config));
    }

    #[test]
    fn test_duplicate_tenant_fails() {
        let toml = format!("{}{}", TENANT, TENANT);
        let config = load_config_from_str(&toml).unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate tenant 'acme'"));
    }

    #[test]
    fn test_invalid_tenant_fails() {
        let mut config = load_config_from_str(TENANT).unwrap();
        config.tenants[0].ticketing.base_url = String::new();
        assert_err!(validate_config(&config));
    }
}
