use std::sync::Arc;

use enhancer_core::{Config, Dispatcher, EnhancementStore, JobQueue, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn EnhancementStore>,
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn EnhancementStore>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            store,
            dispatcher,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn EnhancementStore {
        self.store.as_ref()
    }

    pub fn queue(&self) -> &dyn JobQueue {
        self.dispatcher.queue().as_ref()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
