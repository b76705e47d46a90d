pub mod config;
pub mod dispatcher;
pub mod enhancement;
pub mod gatherer;
pub mod orchestrator;
pub mod synthesizer;
pub mod tenant;
pub mod testing;
pub mod updater;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    SanitizedConfig, ServerConfig,
};
pub use dispatcher::{
    Dispatcher, DispatcherConfig, DispatcherStatus, JobQueue, QueueError, QueuedJob,
    SqliteJobQueue,
};
pub use enhancement::{
    EnhancementFilter, EnhancementRecord, EnhancementRequest, EnhancementStatus,
    EnhancementStore, SqliteEnhancementStore, StoreError,
};
pub use gatherer::{
    build_gatherers, GatherRequest, GatherResult, GatherStatus, GatheredContext, Gatherer,
    GatherersConfig,
};
pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorError, DEADLINE_EXCEEDED};
pub use synthesizer::{
    create_llm_client, LlmClient, LlmConfig, LlmError, SynthesisResult, SynthesisSource,
    Synthesizer, SynthesizerConfig,
};
pub use tenant::{StaticTenantProvider, TenantConfig, TenantConfigProvider, TenantError};
pub use updater::{
    TicketingClient, TicketingError, ToolRegistry, ToolRouter, UpdateResult, Updater,
    UpdaterConfig,
};
