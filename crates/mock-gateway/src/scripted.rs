//! Scripted client - replays canned completions in order.

use std::collections::VecDeque;
use std::sync::Mutex;

use coach_core::{async_trait, ChatClient, Completion, CompletionRequest, LlmError, ToolCall};

/// A client that answers from a queue of prepared results.
///
/// Every request is recorded so tests can assert on the prompts and
/// histories the coach actually sent. When the queue runs dry the client
/// fails with `LlmError::InvalidResponse`.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<Completion, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an arbitrary result.
    pub fn then(self, result: Result<Completion, LlmError>) -> Self {
        self.push(result);
        self
    }

    /// Queue a text-only completion.
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.then(Ok(Completion::text(text)))
    }

    /// Queue a completion with a single tool call and no text.
    ///
    /// `arguments` is sent verbatim, so malformed JSON can be scripted too.
    pub fn then_tool(self, name: &str, arguments: impl Into<String>) -> Self {
        let id = format!("call_{}", self.len() + self.request_count());
        self.then(Ok(Completion::tool_call(ToolCall::function(
            id, name, arguments,
        ))))
    }

    /// Queue an error.
    pub fn then_error(self, error: LlmError) -> Self {
        self.then(Err(error))
    }

    /// Queue a result on a shared client.
    pub fn push(&self, result: Result<Completion, LlmError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(result);
        }
    }

    /// Number of results still queued.
    pub fn len(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether the script has been fully consumed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// A copy of every request received, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".to_string())))
    }

    fn name(&self) -> &str {
        "ScriptedClient"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_core::ChatMessage;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest::new("system", vec![ChatMessage::user(text)])
    }

    #[tokio::test]
    async fn test_replays_in_order() {
        let client = ScriptedClient::new()
            .then_text("first")
            .then_tool("capture_emotion", r#"{"event_summary":"exam"}"#);

        let one = client.complete(request("a")).await.unwrap();
        assert_eq!(one.text_or_empty(), "first");

        let two = client.complete(request("b")).await.unwrap();
        let call = two.first_tool_call().unwrap();
        assert_eq!(call.function.name, "capture_emotion");
        assert!(two.content.is_none());

        assert!(client.is_empty());
        assert_eq!(client.request_count(), 2);
    }

    #[tokio::test]
    async fn test_records_requests() {
        let client = ScriptedClient::new().then_text("ok");
        client.complete(request("remember me")).await.unwrap();

        let last = client.last_request().unwrap();
        assert_eq!(last.messages[0].content, "remember me");
    }

    #[tokio::test]
    async fn test_exhausted_script_fails() {
        let client = ScriptedClient::new();
        let result = client.complete(request("x")).await;
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let client = ScriptedClient::new().then_error(LlmError::from_status(429, "slow down"));
        let result = client.complete(request("x")).await;
        assert!(matches!(result, Err(LlmError::RateLimited(_))));
    }

    #[test]
    fn test_tool_call_ids_are_distinct() {
        let client = ScriptedClient::new()
            .then_tool("complete_stage", "{}")
            .then_tool("complete_stage", "{}");
        let ids: Vec<String> = client
            .script
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.as_ref().unwrap().tool_calls[0].id.clone())
            .collect();
        assert_ne!(ids[0], ids[1]);
    }
}
