//! Core trait and types for chat completion clients.
//!
//! This crate provides the shared interface between the coaching orchestrator
//! and whatever hosted model answers it. It defines:
//!
//! - [`ChatClient`] - The trait every completion backend implements
//! - [`ChatMessage`] / [`ToolCall`] - Turns of a conversation, as persisted and as sent upstream
//! - [`CompletionRequest`] / [`Completion`] - One round trip to the model
//! - [`ToolDefinition`] - Function-calling schemas offered to the model
//! - [`LlmError`] - Error types for completion calls
//!
//! # Example
//!
//! ```rust
//! use coach_core::{async_trait, ChatClient, Completion, CompletionRequest, LlmError};
//!
//! struct Parrot;
//!
//! #[async_trait]
//! impl ChatClient for Parrot {
//!     async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
//!         let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
//!         Ok(Completion::text(last))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "Parrot"
//!     }
//! }
//! ```

mod client;
mod error;
mod message;
mod prompt;
mod tools;

pub use client::{ChatClient, Completion, CompletionRequest, Usage};
pub use error::LlmError;
pub use message::{ChatMessage, Role, ToolCall, ToolCallFunction};
pub use prompt::{hash_prompt, prompt_tag};
pub use tools::{FunctionDefinition, ToolDefinition};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
