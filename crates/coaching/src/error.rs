//! Error types for coaching operations.

use coach_core::LlmError;
use database::DatabaseError;
use thiserror::Error;

/// A state change that the session script does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The session already has its briefing.
    #[error("session is already completed")]
    SessionCompleted,

    /// `complete_stage` named a stage outside 1..=4.
    #[error("stage {0} is not a coaching stage")]
    StageOutOfRange(u8),

    /// A stored stage number outside 0..=5.
    #[error("invalid stored stage {0}")]
    InvalidStage(i64),
}

/// The model asked for a tool with arguments we cannot use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedToolCall {
    /// The tool name is not one the coach offers.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The arguments are not a JSON object.
    #[error("{tool}: arguments are not valid JSON: {reason}")]
    InvalidJson { tool: String, reason: String },

    /// A required field is missing or has the wrong type.
    #[error("{tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// Stage template configuration problems, found when templates are loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// `stage_prompts` is not valid JSON.
    #[error("stage prompts are not valid JSON: {0}")]
    InvalidJson(String),

    /// The document has no `stages` object.
    #[error("stage prompts have no stages")]
    MissingStages,

    /// A required stage key is absent or empty.
    #[error("stage prompt {0} is missing")]
    MissingStage(u8),

    /// A `max_rounds` override is unusable.
    #[error("invalid max_rounds for stage {stage}: {reason}")]
    InvalidMaxRounds { stage: String, reason: String },
}

/// Errors that can occur while coaching.
#[derive(Debug, Error)]
pub enum CoachError {
    /// The completion call failed.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Persistence failed.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The coach template is unusable.
    #[error("coach template error: {0}")]
    Template(#[from] TemplateError),

    /// The requested state change is not allowed.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The model kept producing unusable tool arguments.
    #[error("malformed tool call: {0}")]
    MalformedToolCall(#[from] MalformedToolCall),

    /// Session, template or briefing not found (or not visible to the caller).
    #[error("{0} not found")]
    NotFound(String),

    /// The free allowance for this kind of session is used up.
    #[error("{message}")]
    QuotaExhausted { message: String },

    /// The request itself is unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A stored session row could not be decoded.
    #[error("corrupt session {id}: {reason}")]
    CorruptSession { id: String, reason: String },
}

/// Result type for coaching operations.
pub type Result<T> = std::result::Result<T, CoachError>;
