//! # Hookrelay Kubernetes Adapter
//!
//! Reads repository credential secrets and Kabanero custom resources
//! straight from the Kubernetes API server.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hookrelay_adapter_kube::{KubeClient, KubeConfig, KubeSecretStore};
//!
//! let client = KubeClient::new(KubeConfig::in_cluster()?)?;
//! let store = KubeSecretStore::new(client);
//! let resolver = CredentialResolver::new(Arc::new(store.clone()), "kabanero");
//! let index_url = store.kabanero_index_url("kabanero").await?;
//! ```

pub mod client;
pub mod error;
pub mod kabanero;

pub use client::{KubeClient, KubeConfig, SERVICE_ACCOUNT_DIR};
pub use error::{KubeError, KubeResult};
pub use kabanero::{Kabanero, active_index_url};

use async_trait::async_trait;
use hookrelay_core::error::RelayResult;
use hookrelay_core::store::{SecretObject, SecretStore};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ObjectList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Secret store backed by the Kubernetes API.
///
/// Secrets are listed on every call; caching is left to the resolver.
#[derive(Debug, Clone)]
pub struct KubeSecretStore {
    client: KubeClient,
}

impl KubeSecretStore {
    /// Creates a store using `client`.
    pub fn new(client: KubeClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &KubeClient {
        &self.client
    }

    /// Lists the secrets in `namespace`.
    pub async fn secrets(&self, namespace: &str) -> KubeResult<Vec<SecretObject>> {
        let path = format!("/api/v1/namespaces/{}/secrets", namespace);
        let list: ObjectList<SecretObject> = self.client.get_json(&path).await?;
        Ok(list.items)
    }

    /// Lists the Kabanero instances in `namespace`.
    pub async fn kabaneros(&self, namespace: &str) -> KubeResult<Vec<Kabanero>> {
        let path = format!(
            "/apis/{}/{}/namespaces/{}/{}",
            kabanero::KABANERO_GROUP,
            kabanero::KABANERO_VERSION,
            namespace,
            kabanero::KABANEROS
        );
        let list: ObjectList<Kabanero> = self.client.get_json(&path).await.inspect_err(|e| {
            tracing::error!(namespace, error = %e, "unable to list kabanero resources");
        })?;
        Ok(list.items)
    }

    /// Returns the collection index URL of the first repository with
    /// default collections activated.
    pub async fn kabanero_index_url(&self, namespace: &str) -> KubeResult<String> {
        let instances = self.kabaneros(namespace).await?;
        active_index_url(&instances)
            .map(str::to_string)
            .ok_or_else(|| KubeError::IndexNotFound {
                namespace: namespace.to_string(),
            })
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn list_secrets(&self, namespace: &str) -> RelayResult<Vec<SecretObject>> {
        Ok(self.secrets(namespace).await?)
    }
}
