//! Error types for Beacon.
//!
//! Library crates use [`BeaconError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-URL crawl failures are deliberately absent: they are absorbed by the
//! crawler and never surface as a `BeaconError`.

use std::path::PathBuf;

/// Top-level error type for all Beacon pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    /// An external search or rerank backend failed.
    #[error("provider error in {operation}: {message}")]
    Provider {
        operation: &'static str,
        message: String,
    },

    /// Vector-store read or write failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Embedding backend failure (network, status, or malformed response).
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid caller input (blank query, malformed identifier, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BeaconError>;

impl BeaconError {
    /// Create a provider error tagged with the failing operation.
    pub fn provider(operation: &'static str, msg: impl Into<String>) -> Self {
        Self::Provider {
            operation,
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from the vector store.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Whether this error came from an external search or rerank service.
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BeaconError::provider("search", "HTTP 429 Too Many Requests");
        assert_eq!(
            err.to_string(),
            "provider error in search: HTTP 429 Too Many Requests"
        );
        assert!(err.is_provider());

        let err = BeaconError::Storage("disk I/O error".into());
        assert!(err.to_string().contains("disk I/O error"));
        assert!(err.is_storage());
        assert!(!err.is_provider());
    }

    #[test]
    fn config_error_carries_message() {
        let err = BeaconError::config("COHERE_API_KEY is not set");
        assert_eq!(err.to_string(), "config error: COHERE_API_KEY is not set");
    }
}
