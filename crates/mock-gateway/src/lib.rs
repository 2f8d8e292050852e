//! Mock chat clients for exercising the coaching flow without a provider.
//!
//! `ScriptedClient` replays a queue of canned completions, tool calls and
//! errors, and records every request it receives. For production use, see the
//! `gateway-client` crate.
//!
//! # Example
//!
//! ```rust
//! use mock_gateway::{ChatClient, ChatMessage, Completion, CompletionRequest, ScriptedClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_gateway::LlmError> {
//!     let client = ScriptedClient::new().then_text("Hello there.");
//!
//!     let request = CompletionRequest::new("system", vec![ChatMessage::user("hi")]);
//!     let completion = client.complete(request).await?;
//!     assert_eq!(completion.text_or_empty(), "Hello there.");
//!     Ok(())
//! }
//! ```

mod scripted;

// Re-export coach-core types for convenience
pub use coach_core::{
    async_trait, ChatClient, ChatMessage, Completion, CompletionRequest, LlmError, ToolCall,
};

pub use scripted::ScriptedClient;
