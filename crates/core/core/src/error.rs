//! Error types for hookrelay.
//!
//! This module defines the `RelayError` enum covering credential resolution,
//! secret store access, and (through [`EventError`]) message transport.

use hookrelay_events::EventError;
use thiserror::Error;

/// The main error type for hookrelay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    // ==================== Credential Errors ====================
    /// No credential record matches the repository URL.
    #[error("Unable to find API token for url: {url}")]
    NotFound { url: String },

    /// A matched credential record holds malformed data.
    #[error("Unable to decode secret '{secret}': {message}")]
    DecodeError { secret: String, message: String },

    // ==================== Backend Errors ====================
    /// The secret store could not be listed or reached.
    #[error("Backend error: {message}")]
    BackendError { message: String },

    // ==================== Transport Errors ====================
    /// A message provider operation failed.
    #[error(transparent)]
    Transport(#[from] EventError),

    // ==================== Configuration Errors ====================
    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    // ==================== Internal Errors ====================
    /// Serialization/deserialization failed.
    #[error("Serialization error: {message}")]
    SerializationError { message: String },
}

impl RelayError {
    /// Creates a new not found error.
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::NotFound { url: url.into() }
    }

    /// Creates a new decode error.
    pub fn decode(secret: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DecodeError {
            secret: secret.into(),
            message: message.into(),
        }
    }

    /// Creates a new backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::BackendError {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Returns true if retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::BackendError { .. }
                | Self::Transport(EventError::Transport(_))
                | Self::Transport(EventError::Timeout(_))
        )
    }
}

/// A Result type alias using RelayError.
pub type RelayResult<T> = Result<T, RelayError>;

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_display() {
        let err = RelayError::not_found("https://github.com/org/repo");
        assert_eq!(
            err.to_string(),
            "Unable to find API token for url: https://github.com/org/repo"
        );

        let err: RelayError = EventError::NotSubscribed("src".into()).into();
        assert_eq!(err.to_string(), "No subscription for event source 'src'");
    }

    #[test]
    fn test_is_transient() {
        assert!(RelayError::backend("connection refused").is_transient());
        assert!(RelayError::from(EventError::Timeout(Duration::from_secs(1))).is_transient());
        assert!(!RelayError::decode("s", "bad base64").is_transient());
        assert!(!RelayError::not_found("u").is_transient());
    }
}
