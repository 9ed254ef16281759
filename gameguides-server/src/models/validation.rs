//! Validation error types

use std::fmt;

/// Validation error for guide input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field was not supplied
    Missing { field: &'static str },

    /// Field is blank when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format (e.g., slug)
    InvalidFormat { field: &'static str, reason: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "{} is required", field),
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} cannot be more than {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "title",
            max: 100,
        };
        assert_eq!(err.to_string(), "title cannot be more than 100 characters");

        let err = ValidationError::Missing { field: "content" };
        assert_eq!(err.to_string(), "content is required");
    }

    #[test]
    fn invalid_format_names_field() {
        let err = ValidationError::InvalidFormat {
            field: "slug",
            reason: "must contain at least one letter or digit",
        };
        assert_eq!(err.to_string(), "slug: must contain at least one letter or digit");
    }
}
