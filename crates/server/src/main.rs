use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use enhancer_core::{
    build_gatherers, load_config, validate_config, Dispatcher, EnhancementStore, JobQueue,
    Orchestrator, SqliteEnhancementStore, SqliteJobQueue, StaticTenantProvider, Synthesizer,
    TenantConfigProvider, ToolRegistry, Updater,
};
use enhancer_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());
    let json = std::env::var("ENHANCER_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run() -> Result<()> {
    init_logging();

    // Determine config path
    let config_path = std::env::var("ENHANCER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        tenants = config.tenants.len(),
        "Configuration loaded successfully"
    );
    info!("Database path: {:?}", config.database.path);

    // Record store and job queue share the database file
    let store: Arc<dyn EnhancementStore> = Arc::new(
        SqliteEnhancementStore::new(&config.database.path)
            .context("Failed to create enhancement store")?,
    );
    let queue: Arc<dyn JobQueue> = Arc::new(
        SqliteJobQueue::new(&config.database.path).context("Failed to create job queue")?,
    );
    info!("Enhancement store and job queue initialized");

    let gatherers = build_gatherers(&config.gatherers).context("Failed to build gatherers")?;

    let synthesizer = Synthesizer::from_config(config.synthesizer.clone())
        .context("Failed to create synthesizer")?;
    match &config.synthesizer.llm {
        Some(llm) => info!(provider = ?llm.provider, model = %llm.model, "Model endpoint configured"),
        None => warn!("No model endpoint configured, every synthesis will use the fallback formatter"),
    }

    let router = ToolRegistry::with_defaults();
    info!(tool_types = ?router.tool_types(), "Ticketing tools registered");

    let orchestrator = Orchestrator::new(
        config.orchestrator.clone(),
        Arc::clone(&store),
        Arc::new(router),
    )
    .with_gatherers(gatherers)
    .with_gather_timeout(Duration::from_millis(config.gatherers.timeout_ms))
    .with_synthesizer(Arc::new(synthesizer))
    .with_updater(Updater::new(config.updater.clone()));
    info!(gatherers = ?orchestrator.gatherer_names(), "Orchestrator initialized");

    let tenants: Arc<dyn TenantConfigProvider> =
        Arc::new(StaticTenantProvider::new(config.tenants.clone()));

    let dispatcher = Arc::new(Dispatcher::new(
        config.dispatcher.clone(),
        queue,
        tenants,
        Arc::new(orchestrator),
    ));

    if config.dispatcher.enabled {
        dispatcher.start();
        info!("Dispatcher started");
    } else {
        info!("Dispatcher disabled in config, requests will only be queued");
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        Arc::clone(&dispatcher),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // In-flight jobs finish before the workers exit
    if dispatcher.is_running() {
        info!("Stopping dispatcher...");
        dispatcher.stop().await;
    }

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
