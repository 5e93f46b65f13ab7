//! Error types for the Kubernetes adapter.

use hookrelay_core::RelayError;
use thiserror::Error;

/// Errors talking to the Kubernetes API server.
#[derive(Debug, Error)]
pub enum KubeError {
    /// The client could not be configured.
    #[error("Kubernetes configuration error: {0}")]
    Config(String),

    /// The request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API server answered with a non-success status.
    #[error("Kubernetes API returned {status} for {path}: {message}")]
    Status {
        status: u16,
        path: String,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Unable to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    /// No Kabanero instance names an active default collection repository.
    #[error("unable to find collection url in kabanero custom resource for namespace {namespace}")]
    IndexNotFound { namespace: String },
}

/// Result type alias for Kubernetes adapter operations.
pub type KubeResult<T> = Result<T, KubeError>;

impl From<KubeError> for RelayError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Config(message) => RelayError::config(message),
            other => RelayError::backend(other.to_string()),
        }
    }
}
