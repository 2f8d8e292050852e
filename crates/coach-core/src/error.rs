//! Error types for completion calls.

use thiserror::Error;

/// Errors that can occur while talking to the hosted model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    /// The gateway rejected the call with HTTP 429.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The gateway rejected the call with HTTP 402 (credits exhausted).
    #[error("payment required: {0}")]
    PaymentRequired(String),

    /// Any other non-2xx answer from the gateway.
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// The request never got an HTTP answer.
    #[error("network error: {0}")]
    Network(String),

    /// The gateway answered 2xx but the body could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The client is misconfigured (missing key, bad URL).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Message shown to end users when the gateway is rate limiting.
    pub const RATE_LIMITED_MESSAGE: &'static str =
        "Too many requests right now, please try again in a moment.";

    /// Message shown to end users when the gateway account is out of credits.
    pub const PAYMENT_REQUIRED_MESSAGE: &'static str =
        "The AI service quota is used up, please top up to continue.";

    /// Classify a non-success HTTP status from the gateway.
    ///
    /// 429 and 402 carry a translated user-facing message; everything else keeps
    /// the raw upstream detail.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        match status {
            429 => LlmError::RateLimited(Self::RATE_LIMITED_MESSAGE.to_string()),
            402 => LlmError::PaymentRequired(Self::PAYMENT_REQUIRED_MESSAGE.to_string()),
            _ => LlmError::Upstream {
                status,
                message: detail.into(),
            },
        }
    }
}
