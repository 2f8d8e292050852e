//! Input validation for values that end up in the database.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Coach key with characters outside `[a-z0-9_-]`.
    InvalidCoachKey(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCoachKey(msg) => write!(f, "Invalid coach key: {}", msg),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for a coach key.
pub const MAX_COACH_KEY_LENGTH: usize = 64;

/// Maximum allowed length for one user message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Maximum allowed length for a display name, in characters.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 64;

/// Validate a coach key such as `emotion_coach` or `wealth-4q`.
pub fn validate_coach_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::Empty("coach key".to_string()));
    }

    if key.len() > MAX_COACH_KEY_LENGTH {
        return Err(ValidationError::TooLong {
            field: "coach key".to_string(),
            max: MAX_COACH_KEY_LENGTH,
            actual: key.len(),
        });
    }

    if let Some(c) = key
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-'))
    {
        return Err(ValidationError::InvalidCoachKey(format!(
            "invalid character '{}'",
            c
        )));
    }

    Ok(())
}

/// Validate the text of a user message.
pub fn validate_message(message: &str) -> Result<(), ValidationError> {
    let message = message.trim();

    if message.is_empty() {
        return Err(ValidationError::Empty("message".to_string()));
    }

    let chars = message.chars().count();
    if chars > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "message".to_string(),
            max: MAX_MESSAGE_LENGTH,
            actual: chars,
        });
    }

    Ok(())
}

/// Validate a display name.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Empty("display name".to_string()));
    }

    let chars = name.chars().count();
    if chars > MAX_DISPLAY_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "display name".to_string(),
            max: MAX_DISPLAY_NAME_LENGTH,
            actual: chars,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coach_keys() {
        assert!(validate_coach_key("emotion_coach").is_ok());
        assert!(validate_coach_key("wealth-4q").is_ok());
    }

    #[test]
    fn test_invalid_coach_keys() {
        assert!(matches!(
            validate_coach_key(""),
            Err(ValidationError::Empty(_))
        ));
        assert!(matches!(
            validate_coach_key("Emotion"),
            Err(ValidationError::InvalidCoachKey(_))
        ));
        assert!(matches!(
            validate_coach_key("../etc"),
            Err(ValidationError::InvalidCoachKey(_))
        ));
        assert!(matches!(
            validate_coach_key(&"a".repeat(65)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_message_validation() {
        assert!(validate_message("I failed my exam today").is_ok());
        assert!(matches!(
            validate_message("   "),
            Err(ValidationError::Empty(_))
        ));

        // Counted in characters, not bytes
        let cjk = "情".repeat(MAX_MESSAGE_LENGTH);
        assert!(validate_message(&cjk).is_ok());
        assert!(validate_message(&format!("{cjk}情")).is_err());
    }

    #[test]
    fn test_display_name_validation() {
        assert!(validate_display_name("Lin").is_ok());
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::TooLong {
            field: "message".to_string(),
            max: 10,
            actual: 12,
        };
        assert_eq!(err.to_string(), "message is too long (12 chars, max 10)");
    }
}
