//! Synthesizer configuration types.

use serde::{Deserialize, Serialize};

/// Model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Anthropic Messages API.
    Anthropic,
    /// Local Ollama instance.
    Ollama,
}

/// Model endpoint configuration (`[synthesizer.llm]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Model name/identifier.
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or self-hosted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Maximum tokens for completions.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    1024
}

/// Configuration for the `[synthesizer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    /// Global word budget for synthesized text.
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    /// Budget for the model call in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Model endpoint. Without one every synthesis uses the fallback formatter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
}

fn default_max_words() -> usize {
    500
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
            timeout_ms: default_timeout_ms(),
            llm: None,
        }
    }
}

impl SynthesizerConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_words == 0 {
            return Err("max_words must be greater than 0".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be greater than 0".to_string());
        }

        if let Some(llm) = &self.llm {
            if llm.model.is_empty() {
                return Err("LLM model name cannot be empty".to_string());
            }
            // Ollama runs locally without a key; a proxy base URL may also stand in for one.
            if llm.provider != LlmProvider::Ollama
                && llm.api_key.is_none()
                && llm.api_base.is_none()
            {
                return Err(format!(
                    "LLM provider {:?} requires api_key or api_base",
                    llm.provider
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SynthesizerConfig::default();
        assert_eq!(config.max_words, 500);
        assert_eq!(config.timeout_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_anthropic_requires_key_or_base() {
        let mut config = SynthesizerConfig {
            llm: Some(LlmConfig {
                provider: LlmProvider::Anthropic,
                model: "claude-3-haiku-20240307".to_string(),
                api_key: None,
                api_base: None,
                max_tokens: 1024,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.llm.as_mut().unwrap().api_base = Some("http://proxy:8080".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ollama_without_key_is_valid() {
        let config = SynthesizerConfig {
            llm: Some(LlmConfig {
                provider: LlmProvider::Ollama,
                model: "llama3".to_string(),
                api_key: None,
                api_base: None,
                max_tokens: 512,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_max_words_invalid() {
        let config = SynthesizerConfig {
            max_words: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
