//! # Hookrelay Core
//!
//! This crate provides the foundational pieces of hookrelay: identifier
//! canonicalization, repository credential resolution over a pluggable secret
//! store, the shared error type, and the context object handed to the
//! gateway and listeners.

pub mod context;
pub mod credentials;
pub mod error;
pub mod naming;
pub mod store;

// Re-export commonly used items at the crate root
pub use context::RelayContext;
pub use credentials::{CachePolicy, CredentialRecord, CredentialResolver, ResolvedCredential};
pub use error::{RelayError, RelayResult};
pub use naming::{to_domain_name, to_label, to_label_name, Grammar, NO_LABEL};
pub use store::{SecretMetadata, SecretObject, SecretStore};

// Re-export transport types from the events crate
pub use hookrelay_events as events;
pub use hookrelay_events::{
    EventDefinitions, EventError, EventNode, EventProviders, MessageHandler, MessageProvider,
    ProviderDefinition,
};
