use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::dispatcher::DispatcherConfig;
use crate::gatherer::GatherersConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::synthesizer::{LlmProvider, SynthesizerConfig};
use crate::tenant::{TenantConfig, TenantPreferences};
use crate::updater::UpdaterConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub gatherers: GatherersConfig,
    #[serde(default)]
    pub synthesizer: SynthesizerConfig,
    #[serde(default)]
    pub updater: UpdaterConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file holding enhancement records and the job queue.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("enhancer.db")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub orchestrator: OrchestratorConfig,
    pub gatherers: GatherersConfig,
    pub synthesizer: SanitizedSynthesizerConfig,
    pub updater: UpdaterConfig,
    pub dispatcher: DispatcherConfig,
    pub tenants: Vec<SanitizedTenantConfig>,
}

/// Sanitized synthesizer config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSynthesizerConfig {
    pub max_words: usize,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<SanitizedLlmConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub api_key_configured: bool,
    pub max_tokens: u32,
}

/// Sanitized tenant config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTenantConfig {
    pub tenant_id: String,
    pub tool_type: String,
    pub enabled: bool,
    pub ticketing_base_url: String,
    pub ticketing_api_key_configured: bool,
    pub gatherers: BTreeMap<String, SanitizedGathererEndpoint>,
    pub preferences: TenantPreferences,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedGathererEndpoint {
    pub url: String,
    pub api_key_configured: bool,
}

fn key_configured(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|k| !k.is_empty())
}

impl From<&TenantConfig> for SanitizedTenantConfig {
    fn from(tenant: &TenantConfig) -> Self {
        Self {
            tenant_id: tenant.tenant_id.clone(),
            tool_type: tenant.tool_type.clone(),
            enabled: tenant.enabled,
            ticketing_base_url: tenant.ticketing.base_url.clone(),
            ticketing_api_key_configured: key_configured(&tenant.ticketing.api_key),
            gatherers: tenant
                .gatherers
                .iter()
                .map(|(name, endpoint)| {
                    (
                        name.clone(),
                        SanitizedGathererEndpoint {
                            url: endpoint.url.clone(),
                            api_key_configured: key_configured(&endpoint.api_key),
                        },
                    )
                })
                .collect(),
            preferences: tenant.preferences.clone(),
        }
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            orchestrator: config.orchestrator.clone(),
            gatherers: config.gatherers.clone(),
            synthesizer: SanitizedSynthesizerConfig {
                max_words: config.synthesizer.max_words,
                timeout_ms: config.synthesizer.timeout_ms,
                llm: config.synthesizer.llm.as_ref().map(|llm| SanitizedLlmConfig {
                    provider: llm.provider,
                    model: llm.model.clone(),
                    api_base: llm.api_base.clone(),
                    api_key_configured: key_configured(&llm.api_key),
                    max_tokens: llm.max_tokens,
                }),
            },
            updater: config.updater.clone(),
            dispatcher: config.dispatcher.clone(),
            tenants: config.tenants.iter().map(SanitizedTenantConfig::from).collect(),
        }
    }
}
