//! Shared context built once at startup.

use std::sync::Arc;

use hookrelay_events::{EventNode, EventProviders, MessageProvider};

use crate::credentials::CredentialResolver;
use crate::error::{RelayError, RelayResult};

/// Handles shared by the gateway, the credential resolver's callers, and the
/// listeners.
///
/// Constructed once and passed down explicitly; cloning is cheap.
#[derive(Clone)]
pub struct RelayContext {
    /// Connected message providers and their endpoint definitions.
    pub providers: Arc<EventProviders>,
    /// Repository credential lookup.
    pub credentials: Arc<CredentialResolver>,
}

impl RelayContext {
    /// Creates a new context.
    pub fn new(providers: Arc<EventProviders>, credentials: Arc<CredentialResolver>) -> Self {
        Self {
            providers,
            credentials,
        }
    }

    /// Returns the destination node named `name` and the provider owning it.
    pub fn destination(&self, name: &str) -> RelayResult<(EventNode, Arc<dyn MessageProvider>)> {
        let node = self.providers.event_destination(name).ok_or_else(|| {
            RelayError::config(format!(
                "unable to find an eventDestination with the name '{}'",
                name
            ))
        })?;
        let provider = self.providers.provider_for(node)?;
        Ok((node.clone(), provider))
    }

    /// Returns the source node named `name` and the provider owning it.
    pub fn source(&self, name: &str) -> RelayResult<(EventNode, Arc<dyn MessageProvider>)> {
        let node = self.providers.event_source(name).ok_or_else(|| {
            RelayError::config(format!(
                "unable to find an eventSource with the name '{}'",
                name
            ))
        })?;
        let provider = self.providers.provider_for(node)?;
        Ok((node.clone(), provider))
    }
}
