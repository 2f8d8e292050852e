//! Configuration for GatewayClient.

use coach_core::LlmError;
use std::env;

/// Default gateway base URL.
pub const DEFAULT_API_URL: &str = "https://ai.gateway.lovable.dev";

/// Default model name.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Configuration for GatewayClient.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway base URL (the client appends `/v1/chat/completions`).
    pub api_url: String,

    /// API key for authentication.
    pub api_key: String,

    /// Model name to use.
    pub model: String,

    /// Maximum tokens for response.
    pub max_tokens: Option<u32>,

    /// Default temperature for generation (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// HTTP timeout for a single completion call, in seconds.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            temperature: Some(0.7),
            timeout_secs: 60,
        }
    }
}

impl GatewayConfig {
    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `LLM_GATEWAY_API_KEY` - API key for authentication
    ///
    /// Optional environment variables:
    /// - `LLM_GATEWAY_URL` - Base URL (default: https://ai.gateway.lovable.dev)
    /// - `LLM_GATEWAY_MODEL` - Model name (default: google/gemini-2.5-flash)
    /// - `LLM_GATEWAY_MAX_TOKENS` - Max tokens (default: provider default)
    /// - `LLM_GATEWAY_TEMPERATURE` - Temperature (default: 0.7)
    /// - `LLM_GATEWAY_TIMEOUT_SECS` - Request timeout (default: 60)
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = env::var("LLM_GATEWAY_API_KEY")
            .map_err(|_| LlmError::Configuration("LLM_GATEWAY_API_KEY not set".to_string()))?;

        let api_url = env::var("LLM_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let model = env::var("LLM_GATEWAY_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let max_tokens = env::var("LLM_GATEWAY_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok());

        let temperature = env::var("LLM_GATEWAY_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(0.7));

        let timeout_secs = env::var("LLM_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            api_url,
            api_key,
            model,
            max_tokens,
            temperature,
            timeout_secs,
        })
    }

    /// Create a new config builder.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Full URL of the chat-completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.api_url.trim_end_matches('/'))
    }
}

/// Builder for GatewayConfig.
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Set the API URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Set the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = Some(tokens);
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = Some(temp);
        self
    }

    /// Set the request timeout.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> GatewayConfig {
        self.config
    }
}
