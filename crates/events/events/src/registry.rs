//! Registry of connected message providers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::definition::{EventDefinitions, EventNode, ProviderDefinition};
use crate::error::{EventError, EventResult};
use crate::memory::MemoryProvider;
use crate::provider::MessageProvider;

/// Provider type served by [`crate::NatsProvider`].
pub const NATS_PROVIDER_TYPE: &str = "nats";
/// Provider type served by [`MemoryProvider`].
pub const MEMORY_PROVIDER_TYPE: &str = "memory";

/// Event definitions paired with one live provider per definition.
pub struct EventProviders {
    definitions: EventDefinitions,
    providers: HashMap<String, Arc<dyn MessageProvider>>,
}

impl EventProviders {
    /// Validates `definitions` and connects every provider they declare.
    ///
    /// Any connection failure aborts initialization.
    pub async fn initialize(definitions: EventDefinitions) -> EventResult<Self> {
        definitions.validate()?;
        let mut providers = HashMap::new();
        for definition in &definitions.message_providers {
            let provider = connect_provider(definition.clone()).await?;
            providers.insert(definition.name.clone(), provider);
        }
        Ok(Self {
            definitions,
            providers,
        })
    }

    /// Builds a registry from already constructed providers.
    pub fn with_providers(
        definitions: EventDefinitions,
        providers: impl IntoIterator<Item = Arc<dyn MessageProvider>>,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.definition().name.clone(), p))
            .collect();
        Self {
            definitions,
            providers,
        }
    }

    /// Returns the loaded definitions.
    pub fn definitions(&self) -> &EventDefinitions {
        &self.definitions
    }

    /// Looks up a destination node by name.
    pub fn event_destination(&self, name: &str) -> Option<&EventNode> {
        self.definitions.destination(name)
    }

    /// Looks up a source node by name.
    pub fn event_source(&self, name: &str) -> Option<&EventNode> {
        self.definitions.source(name)
    }

    /// Looks up a provider by name.
    pub fn message_provider(&self, name: &str) -> Option<Arc<dyn MessageProvider>> {
        self.providers.get(name).cloned()
    }

    /// Returns the provider owning `node`.
    pub fn provider_for(&self, node: &EventNode) -> EventResult<Arc<dyn MessageProvider>> {
        self.message_provider(&node.provider_ref)
            .ok_or_else(|| EventError::UnknownProvider(node.provider_ref.clone()))
    }
}

async fn connect_provider(definition: ProviderDefinition) -> EventResult<Arc<dyn MessageProvider>> {
    match definition.provider_type.as_str() {
        #[cfg(feature = "nats")]
        NATS_PROVIDER_TYPE => {
            let provider = crate::nats::NatsProvider::connect(definition).await?;
            Ok(Arc::new(provider))
        }
        MEMORY_PROVIDER_TYPE => Ok(Arc::new(MemoryProvider::new(definition))),
        other => Err(EventError::config(format!(
            "message provider '{}' has unsupported type '{}'",
            definition.name, other
        ))),
    }
}
