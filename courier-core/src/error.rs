//! Error types for courier

use thiserror::Error;

/// The main error type for courier operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A conversation queue rejected an enqueue because it is at capacity
    #[error("Queue full for conversation {conversation}: max_size {max_size}")]
    QueueFull {
        conversation: String,
        max_size: usize,
    },
}

/// A specialized Result type for courier operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_full_display() {
        let err = Error::QueueFull {
            conversation: "42".to_string(),
            max_size: 3,
        };
        assert_eq!(err.to_string(), "Queue full for conversation 42: max_size 3");
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
