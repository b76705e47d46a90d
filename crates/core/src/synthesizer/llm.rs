//! Model endpoint clients.
//!
//! A client answers one [`ModelPrompt`] with the note text. Token usage and
//! the serving model are not tracked; the synthesizer only needs the text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::config::{LlmConfig, LlmProvider};
use crate::gatherer::CORRELATION_HEADER;

/// Enhancement notes should be stable across redeliveries.
const TEMPERATURE: f32 = 0.2;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OLLAMA_API_BASE: &str = "http://localhost:11434";

/// Why a model call produced no usable text.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("model endpoint unreachable: {0}")]
    Network(String),

    #[error("model endpoint returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("undecodable model response: {0}")]
    Decode(String),

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model returned no text")]
    EmptyCompletion,

    #[error("model endpoint not configured: {0}")]
    NotConfigured(String),
}

/// One synthesis request for a ticket.
#[derive(Debug, Clone)]
pub struct ModelPrompt {
    /// Standing instructions, including the word budget.
    pub instructions: String,
    /// Ticket and gathered context rendered as text.
    pub ticket: String,
    pub max_tokens: u32,
    /// Forwarded to the endpoint so its logs line up with ours.
    pub correlation_id: String,
}

/// A model endpoint able to write an enhancement note.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name (e.g., "anthropic", "ollama")
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    /// Return the note text for `prompt`.
    async fn complete(&self, prompt: &ModelPrompt) -> Result<String, LlmError>;
}

/// Build the client described by `config`.
pub fn create_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    match config.provider {
        LlmProvider::Anthropic => {
            let api_key = config.api_key.clone().unwrap_or_default();
            if api_key.is_empty() && config.api_base.is_none() {
                return Err(LlmError::NotConfigured(
                    "anthropic requires api_key or api_base".to_string(),
                ));
            }
            let api_base = config.api_base.as_deref().unwrap_or(ANTHROPIC_API_BASE);
            Ok(Arc::new(AnthropicClient::new(api_key, &config.model, api_base)))
        }
        LlmProvider::Ollama => {
            let api_base = config.api_base.as_deref().unwrap_or(OLLAMA_API_BASE);
            Ok(Arc::new(OllamaClient::new(&config.model, api_base)))
        }
    }
}

/// Send `body` and hand back the successful response. Non-2xx statuses
/// become [`LlmError::Status`] with the provider's message when it can be
/// pulled out of the body.
async fn send_json<B: Serialize>(
    builder: reqwest::RequestBuilder,
    body: &B,
    correlation_id: &str,
    error_message: fn(&str) -> Option<String>,
) -> Result<reqwest::Response, LlmError> {
    let response = builder
        .header(CORRELATION_HEADER, correlation_id)
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::Network(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Status {
        status: status.as_u16(),
        message: error_message(&body).unwrap_or(body),
    })
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: api_base.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

fn anthropic_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .pointer("/error/message")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &ModelPrompt) -> Result<String, LlmError> {
        let body = MessagesBody {
            model: &self.model,
            max_tokens: prompt.max_tokens,
            system: &prompt.instructions,
            messages: [UserMessage {
                role: "user",
                content: &prompt.ticket,
            }],
            temperature: TEMPERATURE,
        };

        let builder = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let reply: MessagesReply =
            send_json(builder, &body, &prompt.correlation_id, anthropic_error_message)
                .await?
                .json()
                .await
                .map_err(|e| LlmError::Decode(e.to_string()))?;

        Ok(reply
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect())
    }
}

/// Client for a self-hosted Ollama server.
pub struct OllamaClient {
    client: reqwest::Client,
    model: String,
    api_base: String,
}

impl OllamaClient {
    pub fn new(model: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: model.into(),
            api_base: api_base.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    response: String,
}

fn ollama_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &ModelPrompt) -> Result<String, LlmError> {
        let body = GenerateBody {
            model: &self.model,
            system: &prompt.instructions,
            prompt: &prompt.ticket,
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                num_predict: prompt.max_tokens,
            },
        };

        let builder = self.client.post(format!("{}/api/generate", self.api_base));
        let reply: GenerateReply =
            send_json(builder, &body, &prompt.correlation_id, ollama_error_message)
                .await?
                .json()
                .await
                .map_err(|e| LlmError::Decode(e.to_string()))?;

        Ok(reply.response)
    }
}
