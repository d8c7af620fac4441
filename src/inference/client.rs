//! OpenAI-compatible completion client.
//!
//! Sends chat completion requests (optionally carrying tool schemas) to the
//! configured endpoint and parses the reply into a [`Completion`]. Failures are
//! returned immediately; there is no retry or fallback at this layer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use crate::config::ModelConfig;

use super::errors::InferenceError;
use super::response::parse_completion_response;
use super::types::{ChatCompletionRequest, Completion, CompletionRequest};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ─── CompletionService ───────────────────────────────────────────────────────

/// The completion capability the agent loop depends on.
///
/// Implemented over HTTP by [`InferenceClient`]; tests substitute a scripted
/// implementation. Implementations must not carry request-scoped state, since
/// one instance is shared by every agent invocation.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, InferenceError>;

    /// Identifier of the model behind this service, for logs.
    fn model_name(&self) -> &str;
}

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// HTTP client for the chat-completions endpoint.
///
/// Construct once at process start and share it (`Arc<dyn CompletionService>`).
pub struct InferenceClient {
    http: HttpClient,
    config: ModelConfig,
    api_key: String,
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model_name)
            .finish_non_exhaustive()
    }
}

impl InferenceClient {
    /// Create a client, reading the API key from `config.api_key_env`.
    ///
    /// A missing key is fatal: callers get `MissingApiKey` before any request.
    pub fn from_config(config: ModelConfig) -> Result<Self, InferenceError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| InferenceError::MissingApiKey {
                env_var: config.api_key_env.clone(),
            })?;
        Self::with_api_key(config, api_key)
    }

    /// Create a client with an explicit API key.
    pub fn with_api_key(config: ModelConfig, api_key: String) -> Result<Self, InferenceError> {
        if config.base_url.trim().is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "model.base_url is empty".into(),
            });
        }

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_body(&self, request: CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model_name.clone(),
            messages: request.messages,
            tools: request.tools,
            tool_choice: request.tool_choice,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl CompletionService for InferenceClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, InferenceError> {
        let url = self.completions_url();
        let body = self.build_body(request);

        // Log the request metadata (not the full body, it can be huge)
        tracing::info!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            has_tools = body.tools.is_some(),
            tool_count = body.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout {
                        duration_secs: self.config.request_timeout_secs,
                    }
                } else {
                    InferenceError::ConnectionFailed {
                        endpoint: url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "completion request failed");
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response.text().await.map_err(|e| InferenceError::ResponseParse {
            reason: format!("failed to read response body: {e}"),
        })?;

        let completion = parse_completion_response(&body_text)?;

        tracing::debug!(
            tool_calls = completion.tool_calls.len(),
            finish_reason = ?completion.finish_reason,
            "completion received"
        );

        Ok(completion)
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
