//! Synthesis of bounded enhancement text from gathered context.
//!
//! The [`Synthesizer`] asks the model endpoint for a note and truncates it
//! to the word budget. Any model failure (timeout, error status, empty
//! output, no endpoint configured) falls back to [`fallback_text`], which
//! needs no external call and always succeeds.

mod config;
mod format;
mod llm;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

pub use config::{LlmConfig, LlmProvider, SynthesizerConfig};
pub use format::{build_prompt, fallback_text, truncate_words, TRUNCATION_MARKER};
pub use llm::{create_llm_client, AnthropicClient, LlmClient, LlmError, ModelPrompt, OllamaClient};
pub use types::{SynthesisResult, SynthesisSource};

use crate::enhancement::EnhancementRequest;
use crate::gatherer::GatheredContext;

/// Turns gathered context into a [`SynthesisResult`].
pub struct Synthesizer {
    client: Option<Arc<dyn LlmClient>>,
    config: SynthesizerConfig,
}

impl Synthesizer {
    pub fn new(client: Option<Arc<dyn LlmClient>>, config: SynthesizerConfig) -> Self {
        Self { client, config }
    }

    /// Build a synthesizer, creating the model client from `config.llm` if present.
    pub fn from_config(config: SynthesizerConfig) -> Result<Self, LlmError> {
        let client = config.llm.as_ref().map(create_llm_client).transpose()?;
        Ok(Self::new(client, config))
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// Effective word budget for a tenant. A tenant preference can only lower the global cap.
    pub fn max_words_for(&self, preference: Option<usize>) -> usize {
        match preference {
            Some(words) if words > 0 => words.min(self.config.max_words),
            _ => self.config.max_words,
        }
    }

    /// Synthesize enhancement text. Never fails.
    ///
    /// The model call is bounded by the synthesis timeout and by `deadline`,
    /// whichever comes first.
    pub async fn synthesize(
        &self,
        request: &EnhancementRequest,
        context: &GatheredContext,
        max_words: usize,
        deadline: Instant,
    ) -> SynthesisResult {
        let reason = match self.call_model(request, context, max_words, deadline).await {
            Ok(text) => {
                let result = SynthesisResult::model(text, max_words);
                debug!(
                    correlation_id = %request.correlation_id,
                    word_count = result.word_count,
                    "Model synthesis succeeded"
                );
                return result;
            }
            Err(e) => e.to_string(),
        };

        warn!(
            correlation_id = %request.correlation_id,
            tenant_id = %request.tenant_id,
            ticket_id = %request.ticket_id,
            error = %reason,
            "Model synthesis failed, falling back to deterministic formatter"
        );

        SynthesisResult::fallback(fallback_text(context), max_words).with_fallback_reason(reason)
    }

    async fn call_model(
        &self,
        request: &EnhancementRequest,
        context: &GatheredContext,
        max_words: usize,
        deadline: Instant,
    ) -> Result<String, LlmError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| LlmError::NotConfigured("no model endpoint".to_string()))?;

        let budget = Duration::from_millis(self.config.timeout_ms);
        let call_deadline = deadline.min(Instant::now() + budget);

        let (instructions, ticket) = build_prompt(request, context, max_words);
        let prompt = ModelPrompt {
            instructions,
            ticket,
            max_tokens: self
                .config
                .llm
                .as_ref()
                .map(|llm| llm.max_tokens)
                .unwrap_or(1024),
            correlation_id: request.correlation_id.clone(),
        };

        let text = tokio::time::timeout_at(call_deadline, client.complete(&prompt))
            .await
            .map_err(|_| LlmError::Timeout(budget))??;

        if text.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }

        Ok(text)
    }
}
