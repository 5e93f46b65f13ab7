//! Message handler trait and types.

use async_trait::async_trait;

use crate::error::EventResult;

/// Trait for consumers fed by [`MessageProvider::listen_and_serve`].
///
/// [`MessageProvider::listen_and_serve`]: crate::MessageProvider::listen_and_serve
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Returns a unique identifier for this handler.
    fn id(&self) -> &str {
        "anonymous"
    }

    /// Handles one message payload.
    async fn handle(&self, payload: &[u8]) -> EventResult<()>;
}

/// Wrapper for closure-based handlers.
pub struct FnHandler<F>
where
    F: Fn(&[u8]) -> EventResult<()> + Send + Sync,
{
    id: String,
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&[u8]) -> EventResult<()> + Send + Sync,
{
    /// Creates a new function handler.
    pub fn new(id: impl Into<String>, handler: F) -> Self {
        Self {
            id: id.into(),
            handler,
        }
    }
}

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&[u8]) -> EventResult<()> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn handle(&self, payload: &[u8]) -> EventResult<()> {
        (self.handler)(payload)
    }
}
