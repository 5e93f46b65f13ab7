//! Turns inbound webhook requests into published envelopes.

use axum::http::HeaderMap;
use hookrelay_core::RelayContext;
use serde_json::{Map, Value};

use crate::envelope::Envelope;
use crate::error::{WebhookError, WebhookResult};
use crate::signature::{SIGNATURE_HEADER, WebhookSigner};

/// Destination that inbound webhooks are published to by default.
pub const DEFAULT_DESTINATION: &str = "github";

/// What happened to an accepted webhook.
#[derive(Debug)]
pub struct Accepted {
    /// The envelope built from the request.
    pub envelope: Envelope,
    /// Whether the envelope reached the transport.
    pub published: bool,
}

/// Wraps each webhook request into an [`Envelope`] and publishes it to a
/// named destination.
///
/// Publishing is best effort: exactly one send is attempted per request and
/// its failure is logged, never reported to the caller.
pub struct WebhookGateway {
    context: RelayContext,
    destination: String,
    signer: Option<WebhookSigner>,
}

impl WebhookGateway {
    /// Creates a gateway publishing to [`DEFAULT_DESTINATION`].
    pub fn new(context: RelayContext) -> Self {
        Self {
            context,
            destination: DEFAULT_DESTINATION.to_string(),
            signer: None,
        }
    }

    /// Sets the destination node name.
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Requires every request to carry a valid `X-Hub-Signature-256`.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.signer = Some(WebhookSigner::new(secret));
        self
    }

    /// Returns the shared context.
    pub fn context(&self) -> &RelayContext {
        &self.context
    }

    /// Returns the destination node name.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Checks the request signature when a secret is configured.
    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> WebhookResult<()> {
        let Some(signer) = &self.signer else {
            return Ok(());
        };
        let header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(WebhookError::MissingSignature)?;
        signer
            .verify_header(header, body)
            .map_err(|_| WebhookError::InvalidSignature)
    }

    /// Verifies and parses a request, then publishes its envelope.
    ///
    /// Fails only when the request itself is rejected.
    pub async fn accept(&self, headers: &HeaderMap, body: &[u8]) -> WebhookResult<Accepted> {
        self.verify(headers, body)?;

        let body: Map<String, Value> = serde_json::from_slice(body).map_err(|e| {
            tracing::error!(error = %e, "unable to unmarshal json body");
            WebhookError::InvalidPayload(e.to_string())
        })?;
        let envelope = Envelope::from_request(headers, body);
        tracing::debug!(header = ?envelope.header, "received webhook");

        let published = match self.publish(&envelope).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(destination = %self.destination, error = %e, "unable to send webhook message");
                false
            }
        };
        Ok(Accepted {
            envelope,
            published,
        })
    }

    /// Sends `envelope` to the destination once.
    pub async fn publish(&self, envelope: &Envelope) -> WebhookResult<()> {
        let (node, provider) = self.context.destination(&self.destination)?;
        let payload = envelope.to_bytes()?;
        provider.send(&node, &payload, None).await?;
        tracing::info!(
            destination = %node.name,
            topic = %node.topic,
            event = envelope.event_type().unwrap_or(""),
            "published webhook"
        );
        Ok(())
    }
}
