//! Error types for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coach_core::LlmError;
use coaching::{CoachError, TransitionError};
use database::DatabaseError;
use thiserror::Error;

/// Errors returned by API handlers, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Missing or invalid access token")]
    Unauthorized,

    /// The model provider needs credits, or the user needs to buy access.
    #[error("{message}")]
    PaymentRequired { message: String, upsell: bool },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<CoachError> for ApiError {
    fn from(err: CoachError) -> Self {
        match err {
            CoachError::Llm(LlmError::RateLimited(message)) => ApiError::RateLimited(message),
            CoachError::Llm(LlmError::PaymentRequired(message)) => ApiError::PaymentRequired {
                message,
                upsell: false,
            },
            CoachError::Llm(LlmError::Configuration(message)) => {
                ApiError::ServiceUnavailable(message)
            }
            CoachError::QuotaExhausted { message } => ApiError::PaymentRequired {
                message,
                upsell: true,
            },
            CoachError::Transition(TransitionError::SessionCompleted) => {
                ApiError::Conflict("This session is already completed".to_string())
            }
            CoachError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            CoachError::InvalidInput(message) => ApiError::BadRequest(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}: {}", status, self);
        } else {
            tracing::debug!("{}: {}", status, self);
        }

        let body = match &self {
            ApiError::PaymentRequired { message, upsell } if *upsell => {
                serde_json::json!({ "error": message, "upsell": true })
            }
            other => serde_json::json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use coaching::MalformedToolCall;

    #[test]
    fn test_coach_error_mapping() {
        let cases: Vec<(CoachError, StatusCode)> = vec![
            (
                LlmError::from_status(429, "slow down").into(),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                LlmError::from_status(402, "credits").into(),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                LlmError::from_status(500, "boom").into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                LlmError::Configuration("no key".to_string()).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                TransitionError::SessionCompleted.into(),
                StatusCode::CONFLICT,
            ),
            (
                MalformedToolCall::UnknownTool("x".to_string()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CoachError::NotFound("session s1".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                CoachError::InvalidInput("empty".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CoachError::QuotaExhausted {
                    message: "buy".to_string(),
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_error_messages_are_not_empty() {
        let err = ApiError::from(CoachError::from(MalformedToolCall::InvalidJson {
            tool: "complete_stage".to_string(),
            reason: "EOF".to_string(),
        }));
        assert!(!err.to_string().is_empty());
        assert!(err.to_string().contains("complete_stage"));
        assert!(!ApiError::Unauthorized.to_string().is_empty());
    }
}
