//! The transport-agnostic message provider contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::definition::{EventNode, ProviderDefinition};
use crate::error::EventResult;
use crate::handler::MessageHandler;
use crate::listener::ShutdownSignal;

/// Transport headers attached to a published message.
pub type MessageHeaders = HashMap<String, Vec<String>>;

/// A publish/subscribe backend.
///
/// Implementations are shared across tasks and must serialize access to their
/// underlying connection internally.
#[async_trait]
pub trait MessageProvider: Send + Sync {
    /// Returns the definition this provider was built from.
    fn definition(&self) -> &ProviderDefinition;

    /// Publishes `payload` to the subject bound to `destination`.
    ///
    /// Returns only after the broker confirmed the publish with a round trip.
    async fn send(
        &self,
        destination: &EventNode,
        payload: &[u8],
        headers: Option<&MessageHeaders>,
    ) -> EventResult<()>;

    /// Registers a synchronous subscription for `source`, keyed by its name.
    ///
    /// Must be called before [`receive`](Self::receive) on the same source.
    async fn subscribe(&self, source: &EventNode) -> EventResult<()>;

    /// Waits for the next message on the subscription of `source`.
    ///
    /// Fails with `NotSubscribed` if [`subscribe`](Self::subscribe) was never
    /// called, or with `Timeout` once the provider's timeout elapses.
    async fn receive(&self, source: &EventNode) -> EventResult<Vec<u8>>;

    /// Feeds every message arriving on `source` to `handler`, one at a time
    /// and in delivery order.
    ///
    /// Returns when the subscription closes or `shutdown` fires, after
    /// unsubscribing and draining. Setup failures are logged, not retried.
    async fn listen_and_serve(
        &self,
        source: &EventNode,
        handler: Arc<dyn MessageHandler>,
        shutdown: ShutdownSignal,
    );
}
