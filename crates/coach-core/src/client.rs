//! The ChatClient trait definition.

use async_trait::async_trait;

use crate::error::LlmError;
use crate::message::{ChatMessage, ToolCall};
use crate::tools::ToolDefinition;

/// One chat-completion round trip.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// System prompt, sent as the first message.
    pub system_prompt: String,
    /// Conversation history, oldest first, including the newest user turn.
    pub messages: Vec<ChatMessage>,
    /// Function-calling tools offered to the model (may be empty).
    pub tools: Vec<ToolDefinition>,
    /// Sampling temperature override.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a request with a system prompt and history, without tools.
    pub fn new(system_prompt: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages,
            ..Default::default()
        }
    }

    /// Offer tools to the model.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// What the model answered: free text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Text content, if any.
    pub content: Option<String>,
    /// Requested tool calls, in provider order.
    pub tool_calls: Vec<ToolCall>,
    /// Token usage, if reported.
    pub usage: Option<Usage>,
}

impl Completion {
    /// A text-only completion.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// A completion carrying a single tool call and no text.
    pub fn tool_call(call: ToolCall) -> Self {
        Self {
            tool_calls: vec![call],
            ..Default::default()
        }
    }

    /// Text content, or an empty string.
    pub fn text_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// The first tool call, which is the only one the coach acts on.
    pub fn first_tool_call(&self) -> Option<&ToolCall> {
        self.tool_calls.first()
    }
}

/// A backend that turns a conversation into the model's next turn.
///
/// Implementations make exactly one attempt per call; callers decide whether
/// anything is worth retrying. This trait is object-safe and can be used
/// with `Box<dyn ChatClient>`.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Run one completion.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;

    /// Get a human-readable name for this client implementation.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: ChatClient + ?Sized> ChatClient for std::sync::Arc<T> {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        (**self).complete(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
