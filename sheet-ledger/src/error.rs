//! Error types for the sheet ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller input rejected before any store call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote store call failed on the fatal path
    #[error("Store error during {operation}: {message}")]
    Store {
        /// Store operation that failed
        operation: &'static str,
        /// Failure detail (never shown to callers)
        message: String,
    },

    /// Cosmetic formatting failed; logged, never surfaced
    #[error("Formatting error: {0}")]
    Formatting(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Access token acquisition failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap any failure as a store error for `operation`.
    ///
    /// Store errors pass through untouched so the innermost operation name wins.
    pub fn store(operation: &'static str, err: impl Into<Error>) -> Self {
        match err.into() {
            err @ Error::Store { .. } => err,
            other => Error::Store {
                operation,
                message: other.to_string(),
            },
        }
    }

    /// True for errors that must abort an append.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Formatting(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("Failed to parse config: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_wrapping_keeps_inner_operation() {
        let inner = Error::Store {
            operation: "append_rows",
            message: "503".to_string(),
        };
        match Error::store("append", inner) {
            Error::Store { operation, .. } => assert_eq!(operation, "append_rows"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_store_wrapping_converts_other_errors() {
        let err = Error::store("read_range", Error::Auth("expired".to_string()));
        assert!(matches!(err, Error::Store { operation: "read_range", .. }));
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_formatting_is_not_fatal() {
        assert!(!Error::Formatting("x".into()).is_fatal());
        assert!(Error::Validation("x".into()).is_fatal());
    }
}
