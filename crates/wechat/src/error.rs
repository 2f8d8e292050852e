//! Error types for the WeChat callback protocol.

use thiserror::Error;

/// Errors that can occur while handling WeChat callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WechatError {
    /// A required configuration variable is missing.
    #[error("WeChat is not configured: {0} is not set")]
    NotConfigured(&'static str),

    /// The EncodingAESKey does not decode to 32 bytes.
    #[error("invalid EncodingAESKey: {0}")]
    InvalidAesKey(String),

    /// The encrypted payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),

    /// The ciphertext or the decrypted frame is malformed.
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// The plaintext does not fit the 4-byte length field of the frame.
    #[error("message of {0} bytes is too large to encrypt")]
    PayloadTooLarge(usize),

    /// The decrypted frame was addressed to another account.
    #[error("app id mismatch: expected {expected}, got {actual}")]
    AppIdMismatch { expected: String, actual: String },

    /// The XML document could not be read.
    #[error("invalid XML: {0}")]
    Xml(String),

    /// A field the message type requires is absent.
    #[error("missing XML field: {0}")]
    MissingField(&'static str),
}

/// Result type for WeChat operations.
pub type Result<T> = std::result::Result<T, WechatError>;
