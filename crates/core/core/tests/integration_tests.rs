//! Integration tests for hookrelay core
//!
//! This test suite covers:
//! - Credential resolution over a secret store
//! - Cache policies
//! - Context lookups

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hookrelay_core::{
    CachePolicy, CredentialResolver, EventDefinitions, EventNode, EventProviders,
    ProviderDefinition, RelayContext, RelayError, RelayResult, SecretObject, SecretStore,
};

struct CountingStore {
    secrets: Vec<SecretObject>,
    lists: AtomicUsize,
    fail: bool,
}

impl CountingStore {
    fn new(secrets: Vec<SecretObject>) -> Arc<Self> {
        Arc::new(Self {
            secrets,
            lists: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            secrets: Vec::new(),
            lists: AtomicUsize::new(0),
            fail: true,
        })
    }

    fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for CountingStore {
    async fn list_secrets(&self, namespace: &str) -> RelayResult<Vec<SecretObject>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RelayError::backend("connection refused"));
        }
        Ok(self
            .secrets
            .iter()
            .filter(|s| s.metadata.namespace == namespace)
            .cloned()
            .collect())
    }
}

fn secret(name: &str, annotation: (&str, &str), username: &str, token: &str) -> SecretObject {
    SecretObject::new(name, "kabanero")
        .with_annotation(annotation.0, annotation.1)
        .with_data("username", STANDARD.encode(username))
        .with_data("password", STANDARD.encode(token))
}

mod resolver_tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_matching_record() {
        let store = CountingStore::new(vec![
            secret("other", ("kabanero.io/git-0", "https://gitlab.com"), "x", "y"),
            secret("github", ("kabanero.io/git-0", "https://github.com/org"), "bot", "tok"),
        ]);
        let resolver = CredentialResolver::new(store, "kabanero");

        let credential = resolver.resolve("https://github.com/org/repo").await.unwrap();
        assert_eq!(credential.username, "bot");
        assert_eq!(credential.token, "tok");
        assert_eq!(credential.secret_name, "github");
    }

    #[tokio::test]
    async fn test_falls_back_to_tekton_annotations() {
        let store = CountingStore::new(vec![secret(
            "tekton",
            ("tekton.dev/git-0", "https://github.ibm.com"),
            "bot",
            "tok",
        )]);
        let resolver = CredentialResolver::new(store, "kabanero");

        let credential = resolver.resolve("https://github.ibm.com/team/repo").await.unwrap();
        assert_eq!(credential.secret_name, "tekton");
    }

    #[tokio::test]
    async fn test_first_matching_record_wins() {
        // "first" only matches through its fallback family, "second" through
        // its primary family; enumeration order decides.
        let store = CountingStore::new(vec![
            secret("first", ("tekton.dev/git-0", "https://github.com"), "a", "1"),
            secret("second", ("kabanero.io/git-0", "https://github.com/org"), "b", "2"),
        ]);
        let resolver = CredentialResolver::new(store, "kabanero");

        let credential = resolver.resolve("https://github.com/org/repo").await.unwrap();
        assert_eq!(credential.secret_name, "first");
    }

    #[tokio::test]
    async fn test_overlapping_patterns_return_a_match() {
        let store = CountingStore::new(vec![
            secret("org", ("kabanero.io/git-0", "https://github.com/org"), "a", "1"),
            secret("repo", ("kabanero.io/git-0", "https://github.com/org/repo"), "b", "2"),
        ]);
        let resolver = CredentialResolver::new(store, "kabanero");

        let credential = resolver.resolve("https://github.com/org/repo/sub").await.unwrap();
        assert!(["org", "repo"].contains(&credential.secret_name.as_str()));
    }

    #[tokio::test]
    async fn test_not_found() {
        let store = CountingStore::new(vec![secret(
            "github",
            ("kabanero.io/git-0", "https://github.com/org"),
            "bot",
            "tok",
        )]);
        let resolver = CredentialResolver::new(store, "kabanero");

        let err = resolver.resolve("https://github.com/elsewhere/repo").await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound { url } if url == "https://github.com/elsewhere/repo"));
    }

    #[tokio::test]
    async fn test_other_namespace_is_invisible() {
        let mut foreign = secret("github", ("kabanero.io/git-0", "https://github.com"), "a", "b");
        foreign.metadata.namespace = "default".to_string();
        let resolver = CredentialResolver::new(CountingStore::new(vec![foreign]), "kabanero");

        let err = resolver.resolve("https://github.com/org/repo").await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_decode_error_is_fatal() {
        let broken = SecretObject::new("broken", "kabanero")
            .with_annotation("kabanero.io/git-0", "https://github.com")
            .with_data("username", "%%%")
            .with_data("password", STANDARD.encode("tok"));
        let store = CountingStore::new(vec![
            broken,
            secret("good", ("kabanero.io/git-0", "https://github.com"), "bot", "tok"),
        ]);
        let resolver = CredentialResolver::new(store, "kabanero");

        let err = resolver.resolve("https://github.com/org/repo").await.unwrap_err();
        assert!(matches!(err, RelayError::DecodeError { secret, .. } if secret == "broken"));
    }

    #[tokio::test]
    async fn test_record_without_data_is_skipped() {
        let empty = SecretObject::new("empty", "kabanero")
            .with_annotation("kabanero.io/git-0", "https://github.com");
        let store = CountingStore::new(vec![
            empty,
            secret("good", ("kabanero.io/git-0", "https://github.com"), "bot", "tok"),
        ]);
        let resolver = CredentialResolver::new(store, "kabanero");

        let credential = resolver.resolve("https://github.com/org/repo").await.unwrap();
        assert_eq!(credential.secret_name, "good");
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let resolver = CredentialResolver::new(CountingStore::failing(), "kabanero");
        let err = resolver.resolve("https://github.com/org/repo").await.unwrap_err();
        assert!(matches!(err, RelayError::BackendError { .. }));
    }
}

mod cache_tests {
    use super::*;

    fn store() -> Arc<CountingStore> {
        CountingStore::new(vec![secret(
            "github",
            ("kabanero.io/git-0", "https://github.com"),
            "bot",
            "tok",
        )])
    }

    #[tokio::test]
    async fn test_disabled_cache_relists_every_call() {
        let store = store();
        let resolver = CredentialResolver::new(store.clone(), "kabanero");

        for _ in 0..3 {
            resolver.resolve("https://github.com/org/repo").await.unwrap();
        }
        assert_eq!(store.list_count(), 3);
    }

    #[tokio::test]
    async fn test_ttl_cache_reuses_listing() {
        let store = store();
        let resolver = CredentialResolver::new(store.clone(), "kabanero")
            .with_cache_policy(CachePolicy::Ttl(Duration::from_secs(60)));

        for _ in 0..3 {
            resolver.resolve("https://github.com/org/repo").await.unwrap();
        }
        assert_eq!(store.list_count(), 1);

        resolver.invalidate();
        resolver.resolve("https://github.com/org/repo").await.unwrap();
        assert_eq!(store.list_count(), 2);
    }

    #[tokio::test]
    async fn test_ttl_cache_expires() {
        let store = store();
        let resolver = CredentialResolver::new(store.clone(), "kabanero")
            .with_cache_policy(CachePolicy::Ttl(Duration::from_millis(10)));

        resolver.resolve("https://github.com/org/repo").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        resolver.resolve("https://github.com/org/repo").await.unwrap();
        assert_eq!(store.list_count(), 2);
    }
}

mod context_tests {
    use super::*;

    #[tokio::test]
    async fn test_destination_lookup() {
        let definitions = EventDefinitions::new()
            .with_provider(ProviderDefinition::new("loopback", "memory", ""))
            .with_destination(EventNode::new("github", "github.events", "loopback"));
        let providers = Arc::new(EventProviders::initialize(definitions).await.unwrap());
        let resolver = Arc::new(CredentialResolver::new(CountingStore::new(Vec::new()), "kabanero"));
        let context = RelayContext::new(providers, resolver);

        let (node, provider) = context.destination("github").unwrap();
        assert_eq!(node.topic, "github.events");
        assert_eq!(provider.definition().name, "loopback");

        assert!(matches!(
            context.destination("missing"),
            Err(RelayError::ConfigurationError { .. })
        ));
        assert!(context.source("github").is_err());
    }
}
