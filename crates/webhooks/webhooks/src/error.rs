//! Webhook error types.

use hookrelay_core::{EventError, RelayError};
use thiserror::Error;

/// Result type for webhook operations.
pub type WebhookResult<T> = Result<T, WebhookError>;

/// Error type for webhook operations.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// A signature is required but the request carries none.
    #[error("Missing signature")]
    MissingSignature,

    /// Invalid signature.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Invalid payload.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A field the operation needs is absent from the webhook message.
    #[error("webhook message {0} not found")]
    MissingField(String),

    /// Credential lookup or destination resolution failed.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Publishing the envelope failed.
    #[error("Publish failed: {0}")]
    Publish(#[from] EventError),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The repository host answered with an unexpected status.
    #[error("unable to download {path}, http error {status}")]
    UnexpectedStatus { path: String, status: u16 },

    /// Request timeout.
    #[error("Request timeout")]
    Timeout,
}

impl WebhookError {
    /// Returns true if the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingSignature | Self::InvalidSignature | Self::InvalidPayload(_)
        )
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::InvalidPayload(err.to_string())
    }
}

impl From<serde_yaml::Error> for WebhookError {
    fn from(err: serde_yaml::Error) -> Self {
        WebhookError::InvalidPayload(err.to_string())
    }
}

#[cfg(feature = "http-client")]
impl From<reqwest::Error> for WebhookError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WebhookError::Timeout
        } else {
            WebhookError::HttpError(err.to_string())
        }
    }
}
