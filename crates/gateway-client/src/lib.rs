//! OpenAI-compatible chat-completions client.
//!
//! This crate provides a [`ChatClient`] implementation that talks to a hosted
//! chat-completions gateway (any endpoint following the OpenAI contract).
//!
//! # Features
//!
//! - Full history plus function-calling tools in one request
//! - Typed errors: 429 and 402 are classified separately from other failures
//! - Single attempt per call, no retry
//! - Configurable via environment variables
//!
//! # Usage
//!
//! ```rust,no_run
//! use gateway_client::{ChatClient, ChatMessage, CompletionRequest, GatewayClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GatewayClient::from_env()?;
//!     let request = CompletionRequest::new("Be kind.", vec![ChatMessage::user("hi")]);
//!     let completion = client.complete(request).await?;
//!     println!("{}", completion.text_or_empty());
//!     Ok(())
//! }
//! ```

mod api_types;
mod client;
mod config;

pub use client::GatewayClient;
pub use config::{GatewayConfig, GatewayConfigBuilder};

// Re-export coach-core types for convenience
pub use coach_core::{
    async_trait, ChatClient, ChatMessage, Completion, CompletionRequest, LlmError, ToolCall,
    ToolDefinition,
};
