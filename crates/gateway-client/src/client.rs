//! GatewayClient implementation using an OpenAI-compatible API.

use std::time::Duration;

use coach_core::{async_trait, prompt_tag, ChatClient, Completion, CompletionRequest, LlmError, Usage};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::api_types::{ApiError, ChatCompletionRequest, ChatCompletionResponse, WireMessage};
use crate::config::GatewayConfig;

/// A chat client that forwards conversations to a hosted chat-completions gateway.
///
/// Each call is a single HTTP attempt. The provider response is trusted as
/// returned; tool-call arguments are passed through as raw JSON strings and
/// validated by the caller.
pub struct GatewayClient {
    client: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Create a new GatewayClient with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration("gateway API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "GatewayClient initialized with model: {}, url: {}",
            config.model, config.api_url
        );

        Ok(Self { client, config })
    }

    /// Create a GatewayClient from environment variables.
    ///
    /// See [`GatewayConfig::from_env`] for required environment variables.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = GatewayConfig::from_env()?;
        Self::new(config)
    }

    /// Get the configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the wire request for a completion.
    fn build_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(WireMessage::from(&coach_core::ChatMessage::system(
            request.system_prompt.clone(),
        )));
        messages.extend(request.messages.iter().map(WireMessage::from));

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(request.tools.clone())
        };

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: request.temperature.or(self.config.temperature),
            tools,
            stream: false,
        }
    }
}

/// Turn a decoded gateway response into a [`Completion`].
fn into_completion(response: ChatCompletionResponse) -> Result<Completion, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

    let usage = response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(Completion {
        content: choice.message.content.filter(|c| !c.is_empty()),
        tool_calls: choice.message.tool_calls.unwrap_or_default(),
        usage,
    })
}

/// Classify a failed gateway answer, preferring the structured error message.
fn classify_failure(status: u16, body: &str) -> LlmError {
    let detail = serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    LlmError::from_status(status, detail)
}

#[async_trait]
impl ChatClient for GatewayClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let url = self.config.completions_url();
        let body = self.build_request(&request);

        debug!(
            "Sending {} messages and {} tools to gateway (prompt {})",
            body.messages.len(),
            request.tools.len(),
            prompt_tag(&request.system_prompt)
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Gateway error ({}): {}", status.as_u16(), error_text);
            return Err(classify_failure(status.as_u16(), &error_text));
        }

        let decoded: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let completion = into_completion(decoded)?;

        if let Some(usage) = completion.usage {
            debug!(
                "Token usage - prompt: {}, completion: {}, total: {}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        Ok(completion)
    }

    fn name(&self) -> &str {
        "GatewayClient"
    }
}
