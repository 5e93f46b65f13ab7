//! Transport error types.

use std::time::Duration;

use thiserror::Error;

/// Result type for transport operations.
pub type EventResult<T> = Result<T, EventError>;

/// Error type for message providers and event definitions.
#[derive(Debug, Error)]
pub enum EventError {
    /// Publishing, flushing, or subscribing failed at the broker.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No message arrived within the provider's receive window.
    #[error("No message received within {0:?}")]
    Timeout(Duration),

    /// `receive` was called for a source that was never subscribed.
    #[error("No subscription for event source '{0}'")]
    NotSubscribed(String),

    /// A node references a message provider that is not defined.
    #[error("Unknown message provider: {0}")]
    UnknownProvider(String),

    /// The event definitions are inconsistent or cannot be loaded.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Payload or definition (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A message handler reported a failure.
    #[error("Handler failed: {0}")]
    HandlerFailed(String),
}

impl EventError {
    /// Creates a new transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        EventError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for EventError {
    fn from(err: serde_yaml::Error) -> Self {
        EventError::Serialization(err.to_string())
    }
}
