//! Synthesis result types.

use serde::{Deserialize, Serialize};

use super::format::truncate_words;

/// Where the synthesized text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisSource {
    /// Produced by the model endpoint.
    Model,
    /// Produced locally by the deterministic formatter.
    Fallback,
}

impl SynthesisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Fallback => "fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "model" => Some(Self::Model),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

/// Bounded enhancement text ready to be written to the ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub text: String,
    pub source: SynthesisSource,
    /// Never exceeds the word budget the result was built with.
    pub word_count: usize,
    /// Why the model output was not used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl SynthesisResult {
    /// Model output, truncated to `max_words`.
    pub fn model(text: String, max_words: usize) -> Self {
        Self::bounded(text, SynthesisSource::Model, max_words)
    }

    /// Fallback output, truncated to `max_words`.
    pub fn fallback(text: String, max_words: usize) -> Self {
        Self::bounded(text, SynthesisSource::Fallback, max_words)
    }

    pub fn with_fallback_reason(mut self, reason: impl Into<String>) -> Self {
        self.fallback_reason = Some(reason.into());
        self
    }

    fn bounded(text: String, source: SynthesisSource, max_words: usize) -> Self {
        let (text, word_count) = truncate_words(&text, max_words);
        Self {
            text,
            source,
            word_count,
            fallback_reason: None,
        }
    }
}
