//! Error types for Toolyard core.

use std::{error::Error, fmt};

/// Error type for Toolyard domain operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolyardError {
    /// Input failed validation.
    Validation(String),
    /// A referenced record does not exist.
    NotFound(String),
    /// The request collides with existing state (slug taken, slot booked).
    Conflict(String),
    /// A catch-all error with a message.
    Other(String),
}

impl ToolyardError {
    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Build a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl fmt::Display for ToolyardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::NotFound(message) => write!(f, "not found: {message}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ToolyardError {}

/// Convenience result type for Toolyard core.
pub type Result<T> = std::result::Result<T, ToolyardError>;

#[cfg(test)]
mod tests {
    use super::ToolyardError;

    #[test]
    fn validation_error_formats_message() {
        let error = ToolyardError::validation("name is required");
        assert_eq!(format!("{error}"), "name is required");
    }

    #[test]
    fn conflict_and_not_found_are_prefixed() {
        assert_eq!(
            ToolyardError::conflict("slug taken").to_string(),
            "conflict: slug taken"
        );
        assert_eq!(
            ToolyardError::not_found("tool acme").to_string(),
            "not found: tool acme"
        );
    }

    #[test]
    fn other_error_formats_message() {
        let error = ToolyardError::Other("toolyard failed".to_string());
        assert_eq!(format!("{error}"), "toolyard failed");
    }
}
