//! Secret store abstraction.
//!
//! Backends decode their native representation into [`SecretObject`] at the
//! store boundary; everything above this module works with typed records.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RelayResult;

/// Metadata of a stored secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMetadata {
    /// Secret name.
    pub name: String,
    /// Namespace holding the secret.
    #[serde(default)]
    pub namespace: String,
    /// Free-form annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// A namespaced key-value secret.
///
/// Values in `data` are base64-encoded, as served by the Kubernetes API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretObject {
    /// Identifying metadata.
    pub metadata: SecretMetadata,
    /// Base64-encoded values.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl SecretObject {
    /// Creates an empty secret.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            metadata: SecretMetadata {
                name: name.into(),
                namespace: namespace.into(),
                annotations: BTreeMap::new(),
            },
            data: BTreeMap::new(),
        }
    }

    /// Adds an annotation.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.annotations.insert(key.into(), value.into());
        self
    }

    /// Adds an already encoded data value.
    pub fn with_data(mut self, key: impl Into<String>, encoded: impl Into<String>) -> Self {
        self.data.insert(key.into(), encoded.into());
        self
    }
}

/// Trait for backing stores that enumerate secrets.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Lists every secret visible in `namespace`, in the store's own order.
    async fn list_secrets(&self, namespace: &str) -> RelayResult<Vec<SecretObject>>;
}
