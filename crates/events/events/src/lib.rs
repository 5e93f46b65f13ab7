//! # Hookrelay Events
//!
//! Message transport for hookrelay providing:
//! - Provider and endpoint definitions loaded from `eventDefinitions.yaml`
//! - A transport-agnostic [`MessageProvider`] contract
//! - A NATS backend and an in-process loopback backend
//! - Long-lived listeners with an explicit shutdown signal
//!
//! ## Example
//!
//! ```rust,ignore
//! use hookrelay_events::{EventDefinitions, EventProviders};
//!
//! let definitions = EventDefinitions::load("eventDefinitions.yaml")?;
//! let providers = EventProviders::initialize(definitions).await?;
//!
//! let destination = providers.event_destination("github").unwrap();
//! let provider = providers.provider_for(destination)?;
//! provider.send(destination, b"{}", None).await?;
//! ```

mod definition;
mod error;
mod handler;
mod listener;
mod memory;
#[cfg(feature = "nats")]
mod nats;
mod provider;
mod registry;

pub use definition::{
    parse_duration, EventDefinitions, EventNode, ProviderDefinition, DEFAULT_RECEIVE_TIMEOUT,
};
pub use error::{EventError, EventResult};
pub use handler::{FnHandler, MessageHandler};
pub use listener::{ListenerSet, Shutdown, ShutdownSignal};
pub use memory::{MemoryProvider, DEFAULT_BACKLOG_LIMIT};
#[cfg(feature = "nats")]
pub use nats::NatsProvider;
pub use provider::{MessageHeaders, MessageProvider};
pub use registry::{EventProviders, MEMORY_PROVIDER_TYPE, NATS_PROVIDER_TYPE};
