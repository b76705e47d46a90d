//! Enhancement orchestrator implementation.
//!
//! Drives one request through gathering, synthesis and update:
//! - **Gathering**: concurrent, one task per gatherer, each under its own budget
//! - **Synthesis**: sequential, bounded by the synthesis timeout
//! - **Update**: sequential, bounded retry (handled by [`Updater`])

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{error, info, warn, Instrument};

use crate::enhancement::{EnhancementRecord, EnhancementRequest, EnhancementStatus, EnhancementStore};
use crate::gatherer::{GatherRequest, GatherResult, GatheredContext, Gatherer};
use crate::synthesizer::{Synthesizer, SynthesizerConfig};
use crate::tenant::{TenantConfig, TenantError};
use crate::updater::{
    TicketUpdate, TicketingClient, ToolRouter, UpdateError, UpdateResult, Updater, UpdaterConfig,
};

use super::config::OrchestratorConfig;
use super::locks::KeyLocks;
use super::types::{OrchestratorError, DEADLINE_EXCEEDED};

const DEFAULT_GATHER_TIMEOUT: Duration = Duration::from_millis(12_000);

/// The enhancement orchestrator: the only component with pipeline logic.
pub struct Orchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn EnhancementStore>,
    router: Arc<dyn ToolRouter>,
    gatherers: Vec<Arc<dyn Gatherer>>,
    gather_timeout: Duration,
    synthesizer: Arc<Synthesizer>,
    updater: Updater,
    key_locks: KeyLocks,
}

impl Orchestrator {
    /// Create an orchestrator with no gatherers, a model-less synthesizer and
    /// the default updater.
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn EnhancementStore>,
        router: Arc<dyn ToolRouter>,
    ) -> Self {
        Self {
            config,
            store,
            router,
            gatherers: Vec::new(),
            gather_timeout: DEFAULT_GATHER_TIMEOUT,
            synthesizer: Arc::new(Synthesizer::new(None, SynthesizerConfig::default())),
            updater: Updater::new(UpdaterConfig::default()),
            key_locks: KeyLocks::default(),
        }
    }

    /// Register gatherers. A name registered twice keeps its first gatherer.
    pub fn with_gatherers(mut self, gatherers: Vec<Arc<dyn Gatherer>>) -> Self {
        let mut seen: HashSet<String> = self.gatherers.iter().map(|g| g.name().to_string()).collect();
        for gatherer in gatherers {
            if seen.insert(gatherer.name().to_string()) {
                self.gatherers.push(gatherer);
            } else {
                warn!(gatherer = gatherer.name(), "Duplicate gatherer name ignored");
            }
        }
        self
    }

    /// Per-gatherer budget.
    pub fn with_gather_timeout(mut self, timeout: Duration) -> Self {
        self.gather_timeout = timeout;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<Synthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_updater(mut self, updater: Updater) -> Self {
        self.updater = updater;
        self
    }

    pub fn gatherer_names(&self) -> Vec<&str> {
        self.gatherers.iter().map(|g| g.name()).collect()
    }

    /// Run one enhancement attempt to a terminal state.
    ///
    /// `tenant` is the result of the tenant configuration lookup; a lookup
    /// failure fails the attempt before any external call is made.
    ///
    /// Returns the terminal record. Errors are returned only when the record
    /// store cannot be read or written.
    pub async fn enhance(
        &self,
        request: &EnhancementRequest,
        tenant: Result<Arc<TenantConfig>, TenantError>,
    ) -> Result<EnhancementRecord, OrchestratorError> {
        let span = tracing::info_span!(
            "enhance",
            correlation_id = %request.correlation_id,
            tenant_id = %request.tenant_id,
            ticket_id = %request.ticket_id,
        );

        self.enhance_locked(request, tenant).instrument(span).await
    }

    async fn enhance_locked(
        &self,
        request: &EnhancementRequest,
        tenant: Result<Arc<TenantConfig>, TenantError>,
    ) -> Result<EnhancementRecord, OrchestratorError> {
        let _key = self
            .key_locks
            .lock(&request.tenant_id, &request.ticket_id)
            .await;

        let previous = self.store.get(&request.tenant_id, &request.ticket_id)?;
        if let Some(previous) = previous.as_ref() {
            if previous.is_terminal() && previous.correlation_id == request.correlation_id {
                info!(
                    status = %previous.status,
                    "Duplicate request for terminal record, returning previous outcome"
                );
                return Ok(previous.clone());
            }
            if !previous.is_terminal() {
                warn!(
                    status = %previous.status,
                    previous_correlation_id = %previous.correlation_id,
                    "Found unfinished record, re-attempting"
                );
            }
        }

        let deadline = Instant::now() + self.config.deadline();
        let mut record = EnhancementRecord::accept(request, previous.as_ref());
        self.store.upsert(&record)?;
        info!(stage = "pending", attempt = record.attempts, "Enhancement accepted");

        self.run(request, tenant, &mut record, deadline).await?;
        Ok(record)
    }

    async fn run(
        &self,
        request: &EnhancementRequest,
        tenant: Result<Arc<TenantConfig>, TenantError>,
        record: &mut EnhancementRecord,
        deadline: Instant,
    ) -> Result<(), OrchestratorError> {
        // Configuration: resolve everything before the first external call.
        let (tenant, client) = match self.resolve(request, tenant) {
            Ok(resolved) => resolved,
            Err(reason) => {
                return self.fail(record, format!("configuration error: {}", reason));
            }
        };

        // Gathering
        self.transition(record, EnhancementStatus::ContextGathering)?;
        let context = self.gather(request, &tenant, deadline).await;
        record.set_context(context.clone());
        if Instant::now() >= deadline {
            return self.fail(record, DEADLINE_EXCEEDED.to_string());
        }

        // Synthesis
        self.transition(record, EnhancementStatus::Synthesizing)?;
        let max_words = self.synthesizer.max_words_for(tenant.preferences.max_words);
        let synthesis = self
            .synthesizer
            .synthesize(request, &context, max_words, deadline)
            .await;
        info!(
            stage = "synthesizing",
            source = synthesis.source.as_str(),
            word_count = synthesis.word_count,
            "Synthesis finished"
        );
        let text = synthesis.text.clone();
        record.set_synthesis(synthesis);
        if Instant::now() >= deadline {
            return self.fail(record, DEADLINE_EXCEEDED.to_string());
        }

        // Update
        self.transition(record, EnhancementStatus::Updating)?;
        let update = TicketUpdate {
            tenant_id: &request.tenant_id,
            ticket_id: &request.ticket_id,
            correlation_id: &request.correlation_id,
            text: &text,
        };
        let result = self.updater.update(client.as_ref(), update, deadline).await;
        record.update_attempts = result.attempts();

        match result {
            UpdateResult::Applied { attempts } => {
                self.transition(record, EnhancementStatus::Completed)?;
                info!(
                    stage = "completed",
                    update_attempts = attempts,
                    partial_context = record.partial_context,
                    "Enhancement completed"
                );
                Ok(())
            }
            UpdateResult::Failed {
                error: error @ UpdateError::DeadlineExceeded { .. },
                ..
            } => self.fail(record, error.to_string()),
            UpdateResult::Failed { attempts, error } => self.fail(
                record,
                format!("update failed after {} attempt(s): {}", attempts, error),
            ),
        }
    }

    fn resolve(
        &self,
        request: &EnhancementRequest,
        tenant: Result<Arc<TenantConfig>, TenantError>,
    ) -> Result<(Arc<TenantConfig>, Arc<dyn TicketingClient>), String> {
        let tenant = tenant.map_err(|e| e.to_string())?;
        if tenant.tenant_id != request.tenant_id {
            return Err(format!(
                "tenant lookup returned '{}' for '{}'",
                tenant.tenant_id, request.tenant_id
            ));
        }
        if !tenant.enabled {
            return Err(format!("tenant '{}' is disabled", tenant.tenant_id));
        }
        tenant.validate().map_err(|e| e.to_string())?;
        let client = self.router.client_for(&tenant).map_err(|e| e.to_string())?;
        Ok((tenant, client))
    }

    /// Fan out to every gatherer and join. Each gatherer runs in its own task
    /// under its own budget; none can block or cancel a sibling.
    async fn gather(
        &self,
        request: &EnhancementRequest,
        tenant: &Arc<TenantConfig>,
        deadline: Instant,
    ) -> GatheredContext {
        let gather_request = Arc::new(GatherRequest {
            tenant: Arc::clone(tenant),
            correlation_id: request.correlation_id.clone(),
            ticket_text: request.ticket_text(),
            deadline: deadline.min(Instant::now() + self.gather_timeout),
        });

        let (names, tasks): (Vec<String>, Vec<_>) = self
            .gatherers
            .iter()
            .map(|gatherer| {
                let name = gatherer.name().to_string();
                let gatherer = Arc::clone(gatherer);
                let gather_request = Arc::clone(&gather_request);
                let task = tokio::spawn(
                    async move {
                        tokio::time::timeout_at(
                            gather_request.deadline,
                            gatherer.gather(&gather_request),
                        )
                        .await
                    }
                    .in_current_span(),
                );
                (name, task)
            })
            .unzip();

        let mut context = GatheredContext::new();
        for (name, joined) in names.into_iter().zip(join_all(tasks).await) {
            let result = match joined {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => GatherResult::timeout(format!(
                    "no result within {} ms",
                    self.gather_timeout.as_millis()
                )),
                Err(e) => GatherResult::error(format!("gatherer task failed: {}", e)),
            };

            if !result.is_ok() {
                warn!(
                    stage = "context_gathering",
                    gatherer = %name,
                    status = ?result.status,
                    error = result.error_detail.as_deref().unwrap_or(""),
                    "Gatherer did not succeed, continuing with partial context"
                );
            }
            context.insert(name, result);
        }

        context
    }

    fn transition(
        &self,
        record: &mut EnhancementRecord,
        to: EnhancementStatus,
    ) -> Result<(), OrchestratorError> {
        if !record.status.can_transition_to(to) {
            return Err(OrchestratorError::InvalidTransition {
                from: record.status,
                to,
            });
        }

        let now = Utc::now();
        record.status = to;
        record.updated_at = now;
        if to == EnhancementStatus::Completed {
            record.completed_at = Some(now);
        }

        if let Err(e) = self.store.upsert(record) {
            error!(stage = %to, error = %e, "Failed to persist enhancement record");
            return Err(e.into());
        }

        if !to.is_terminal() {
            info!(stage = %to, "Stage started");
        }
        Ok(())
    }

    fn fail(&self, record: &mut EnhancementRecord, message: String) -> Result<(), OrchestratorError> {
        error!(
            stage = %record.status,
            error = %message,
            "Enhancement failed"
        );
        record.error_message = Some(message);
        self.transition(record, EnhancementStatus::Failed)
    }
}
