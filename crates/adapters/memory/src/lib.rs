//! # Hookrelay Memory Adapter
//!
//! An in-memory secret store for hookrelay, primarily intended
//! for testing and local development.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hookrelay_adapter_memory::MemorySecretStore;
//!
//! let store = MemorySecretStore::new();
//! store.insert(SecretObject::new("github", "kabanero")
//!     .with_annotation("kabanero.io/git-0", "https://github.com/org")
//!     .with_data("username", "Ym90")
//!     .with_data("password", "dG9rZW4=")).await;
//!
//! let resolver = CredentialResolver::new(Arc::new(store), "kabanero");
//! ```

use async_trait::async_trait;
use hookrelay_core::error::{RelayError, RelayResult};
use hookrelay_core::store::{SecretObject, SecretStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Secrets per namespace, in insertion order.
type Store = Arc<RwLock<HashMap<String, Vec<SecretObject>>>>;

/// In-memory secret store.
///
/// Listing returns secrets in the order they were inserted. Data is lost
/// when the process exits.
#[derive(Debug, Clone)]
pub struct MemorySecretStore {
    secrets: Store,
    unavailable: Arc<RwLock<Option<String>>>,
}

impl MemorySecretStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            secrets: Arc::new(RwLock::new(HashMap::new())),
            unavailable: Arc::new(RwLock::new(None)),
        }
    }

    /// Inserts a secret, replacing any secret with the same name in the
    /// same namespace while keeping its position.
    pub async fn insert(&self, secret: SecretObject) {
        let mut secrets = self.secrets.write().await;
        let namespace = secrets.entry(secret.metadata.namespace.clone()).or_default();
        match namespace
            .iter_mut()
            .find(|s| s.metadata.name == secret.metadata.name)
        {
            Some(existing) => *existing = secret,
            None => namespace.push(secret),
        }
    }

    /// Removes a secret, returning it if it existed.
    pub async fn remove(&self, namespace: &str, name: &str) -> Option<SecretObject> {
        let mut secrets = self.secrets.write().await;
        let list = secrets.get_mut(namespace)?;
        let index = list.iter().position(|s| s.metadata.name == name)?;
        Some(list.remove(index))
    }

    /// Makes every listing fail with a backend error until cleared.
    pub async fn set_unavailable(&self, reason: Option<String>) {
        *self.unavailable.write().await = reason;
    }

    /// Clears all stored secrets.
    pub async fn clear(&self) {
        self.secrets.write().await.clear();
    }

    /// Returns the number of secrets stored in `namespace`.
    pub async fn secret_count(&self, namespace: &str) -> usize {
        self.secrets
            .read()
            .await
            .get(namespace)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for MemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn list_secrets(&self, namespace: &str) -> RelayResult<Vec<SecretObject>> {
        if let Some(reason) = self.unavailable.read().await.as_ref() {
            return Err(RelayError::backend(reason.clone()));
        }
        let secrets = self.secrets.read().await;
        Ok(secrets.get(namespace).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use hookrelay_core::CredentialResolver;

    fn github_secret(name: &str, url: &str) -> SecretObject {
        SecretObject::new(name, "kabanero")
            .with_annotation("kabanero.io/git-0", url)
            .with_data("username", STANDARD.encode("bot"))
            .with_data("password", STANDARD.encode(format!("{}-token", name)))
    }

    #[tokio::test]
    async fn test_list_by_namespace() {
        let store = MemorySecretStore::new();
        store.insert(github_secret("a", "https://github.com")).await;
        store.insert(SecretObject::new("b", "default")).await;

        let listed = store.list_secrets("kabanero").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].metadata.name, "a");
        assert!(store.list_secrets("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_replaces_in_place() {
        let store = MemorySecretStore::new();
        store.insert(github_secret("a", "https://github.com/one")).await;
        store.insert(github_secret("b", "https://github.com/two")).await;
        store.insert(github_secret("a", "https://github.com/three")).await;

        let listed = store.list_secrets("kabanero").await.unwrap();
        let names: Vec<_> = listed.iter().map(|s| s.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(
            listed[0].metadata.annotations.get("kabanero.io/git-0").unwrap(),
            "https://github.com/three"
        );
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = MemorySecretStore::new();
        store.insert(github_secret("a", "https://github.com")).await;
        store.insert(github_secret("b", "https://github.com")).await;

        assert!(store.remove("kabanero", "a").await.is_some());
        assert!(store.remove("kabanero", "a").await.is_none());
        assert_eq!(store.secret_count("kabanero").await, 1);

        store.clear().await;
        assert_eq!(store.secret_count("kabanero").await, 0);
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = MemorySecretStore::new();
        store.set_unavailable(Some("api server down".into())).await;
        let err = store.list_secrets("kabanero").await.unwrap_err();
        assert!(matches!(err, RelayError::BackendError { message } if message == "api server down"));

        store.set_unavailable(None).await;
        assert!(store.list_secrets("kabanero").await.is_ok());
    }

    #[tokio::test]
    async fn test_resolver_over_memory_store() {
        let store = MemorySecretStore::new();
        store.insert(github_secret("org", "https://github.com/org")).await;
        let resolver = CredentialResolver::new(Arc::new(store.clone()), "kabanero");

        let credential = resolver.resolve("https://github.com/org/repo").await.unwrap();
        assert_eq!(credential.token, "org-token");

        store.remove("kabanero", "org").await;
        assert!(matches!(
            resolver.resolve("https://github.com/org/repo").await,
            Err(RelayError::NotFound { .. })
        ));
    }
}
