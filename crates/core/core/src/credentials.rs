//! Repository credential resolution.
//!
//! A credential secret looks like:
//!
//! ```yaml
//! apiVersion: v1
//! kind: Secret
//! metadata:
//!   name: kabanero-org-test-secret
//!   namespace: kabanero
//!   annotations:
//!     kabanero.io/git-0: https://github.ibm.com/kabanero-org-test
//! type: Opaque
//! data:
//!   username: <base64 encoded user name>
//!   password: <base64 encoded token>
//! ```
//!
//! If an annotated URL is a prefix of the repository URL, the secret's
//! username and token are used for that repository.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{RelayError, RelayResult};
use crate::store::{SecretObject, SecretStore};

/// Annotation prefix searched first.
pub const KABANERO_ANNOTATION_PREFIX: &str = "kabanero.io/git-";
/// Annotation prefix searched when no `kabanero.io/git-` pattern matches.
pub const TEKTON_ANNOTATION_PREFIX: &str = "tekton.dev/git-";

/// Data key holding the encoded username.
pub const USERNAME_KEY: &str = "username";
/// Data key holding the encoded token.
pub const PASSWORD_KEY: &str = "password";

/// A credential secret reduced to what resolution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Secret name.
    pub name: String,
    /// Secret namespace.
    pub namespace: String,
    /// URL prefixes from `kabanero.io/git-*` annotations.
    pub primary_patterns: Vec<String>,
    /// URL prefixes from `tekton.dev/git-*` annotations.
    pub fallback_patterns: Vec<String>,
    encoded_username: Option<String>,
    encoded_token: Option<String>,
}

impl CredentialRecord {
    /// Builds a record from a stored secret.
    pub fn from_secret(secret: &SecretObject) -> Self {
        let mut primary_patterns = Vec::new();
        let mut fallback_patterns = Vec::new();
        for (key, url) in &secret.metadata.annotations {
            if key.starts_with(KABANERO_ANNOTATION_PREFIX) {
                primary_patterns.push(url.clone());
            } else if key.starts_with(TEKTON_ANNOTATION_PREFIX) {
                fallback_patterns.push(url.clone());
            }
        }

        Self {
            name: secret.metadata.name.clone(),
            namespace: secret.metadata.namespace.clone(),
            primary_patterns,
            fallback_patterns,
            encoded_username: secret.data.get(USERNAME_KEY).cloned(),
            encoded_token: secret.data.get(PASSWORD_KEY).cloned(),
        }
    }

    /// Returns the pattern that is a prefix of `url`, if any.
    ///
    /// Primary patterns are tried before fallback patterns.
    pub fn matching_pattern(&self, url: &str) -> Option<&str> {
        match_prefix(url, &self.primary_patterns)
            .or_else(|| match_prefix(url, &self.fallback_patterns))
    }

    /// Returns true if the record carries both a username and a token.
    pub fn is_usable(&self) -> bool {
        !self.name.is_empty() && self.encoded_username.is_some() && self.encoded_token.is_some()
    }

    /// Decodes the username and token.
    pub fn decode(&self) -> RelayResult<ResolvedCredential> {
        let username = decode_field(&self.name, USERNAME_KEY, self.encoded_username.as_deref())?;
        let token = decode_field(&self.name, PASSWORD_KEY, self.encoded_token.as_deref())?;
        Ok(ResolvedCredential {
            username,
            token,
            secret_name: self.name.clone(),
        })
    }
}

fn match_prefix<'a>(url: &str, patterns: &'a [String]) -> Option<&'a str> {
    patterns
        .iter()
        .find(|pattern| url.starts_with(pattern.as_str()))
        .map(|pattern| pattern.as_str())
}

fn decode_field(secret: &str, key: &str, encoded: Option<&str>) -> RelayResult<String> {
    let encoded = encoded.ok_or_else(|| RelayError::decode(secret, format!("missing {}", key)))?;
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| RelayError::decode(secret, format!("{}: {}", key, e)))?;
    String::from_utf8(bytes).map_err(|e| RelayError::decode(secret, format!("{}: {}", key, e)))
}

/// A username/token pair for a repository host.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    /// Decoded username.
    pub username: String,
    /// Decoded API token.
    pub token: String,
    /// Name of the secret it came from.
    pub secret_name: String,
}

impl fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("secret_name", &self.secret_name)
            .finish()
    }
}

/// How secret listings are reused between resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// List the store on every call.
    #[default]
    Disabled,
    /// Reuse a listing for up to the given duration.
    Ttl(Duration),
}

impl CachePolicy {
    /// Builds a policy from a number of seconds; zero disables caching.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            CachePolicy::Disabled
        } else {
            CachePolicy::Ttl(Duration::from_secs(secs))
        }
    }
}

struct CachedListing {
    fetched_at: Instant,
    records: Arc<Vec<CredentialRecord>>,
}

/// Finds repository credentials by URL prefix.
///
/// Exactly the first record, in the store's enumeration order, whose pattern
/// set contains a prefix of the queried URL is returned. When several records
/// match, which one wins depends on that order.
pub struct CredentialResolver {
    store: Arc<dyn SecretStore>,
    namespace: String,
    policy: CachePolicy,
    cache: Mutex<Option<CachedListing>>,
}

impl CredentialResolver {
    /// Creates a resolver that lists `namespace` on every call.
    pub fn new(store: Arc<dyn SecretStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            policy: CachePolicy::Disabled,
            cache: Mutex::new(None),
        }
    }

    /// Sets the cache policy.
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the namespace searched.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the cache policy.
    pub fn cache_policy(&self) -> CachePolicy {
        self.policy
    }

    /// Drops any cached listing.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }

    /// Resolves the credential for `repository_url`.
    ///
    /// Fails with `NotFound` if nothing matches, `BackendError` if the store
    /// cannot be listed, and `DecodeError` if the matched record is malformed.
    pub async fn resolve(&self, repository_url: &str) -> RelayResult<ResolvedCredential> {
        tracing::debug!(namespace = %self.namespace, repository_url, "resolving API token");
        let records = self.records().await?;

        for record in records.iter() {
            let Some(pattern) = record.matching_pattern(repository_url) else {
                continue;
            };
            if !record.is_usable() {
                tracing::debug!(
                    secret = %record.name,
                    "secret matches {} but has no username/password, skipping",
                    pattern
                );
                continue;
            }
            tracing::debug!(secret = %record.name, pattern, "found API token match");
            return record.decode();
        }

        Err(RelayError::not_found(repository_url))
    }

    async fn records(&self) -> RelayResult<Arc<Vec<CredentialRecord>>> {
        if let CachePolicy::Ttl(ttl) = self.policy {
            if let Some(records) = self.cached(ttl) {
                return Ok(records);
            }
        }

        let secrets = self.store.list_secrets(&self.namespace).await?;
        let records: Arc<Vec<CredentialRecord>> =
            Arc::new(secrets.iter().map(CredentialRecord::from_secret).collect());

        if let CachePolicy::Ttl(_) = self.policy {
            if let Ok(mut cache) = self.cache.lock() {
                *cache = Some(CachedListing {
                    fetched_at: Instant::now(),
                    records: records.clone(),
                });
            }
        }
        Ok(records)
    }

    fn cached(&self, ttl: Duration) -> Option<Arc<Vec<CredentialRecord>>> {
        let cache = self.cache.lock().ok()?;
        cache
            .as_ref()
            .filter(|listing| listing.fetched_at.elapsed() < ttl)
            .map(|listing| listing.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &str) -> String {
        STANDARD.encode(value)
    }

    #[test]
    fn test_record_patterns() {
        let secret = SecretObject::new("creds", "kabanero")
            .with_annotation("kabanero.io/git-0", "https://github.com/org")
            .with_annotation("tekton.dev/git-0", "https://github.com")
            .with_annotation("unrelated", "https://example.com");
        let record = CredentialRecord::from_secret(&secret);

        assert_eq!(record.primary_patterns, vec!["https://github.com/org"]);
        assert_eq!(record.fallback_patterns, vec!["https://github.com"]);
        assert_eq!(
            record.matching_pattern("https://github.com/org/repo"),
            Some("https://github.com/org")
        );
        assert_eq!(
            record.matching_pattern("https://github.com/other/repo"),
            Some("https://github.com")
        );
        assert_eq!(record.matching_pattern("https://example.com/org"), None);
    }

    #[test]
    fn test_decode_fields() {
        let secret = SecretObject::new("creds", "kabanero")
            .with_data(USERNAME_KEY, encode("bot"))
            .with_data(PASSWORD_KEY, encode("s3cr3t"));
        let credential = CredentialRecord::from_secret(&secret).decode().unwrap();
        assert_eq!(credential.username, "bot");
        assert_eq!(credential.token, "s3cr3t");
        assert_eq!(credential.secret_name, "creds");
        assert!(!format!("{:?}", credential).contains("s3cr3t"));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let secret = SecretObject::new("creds", "kabanero")
            .with_data(USERNAME_KEY, "not base64!!")
            .with_data(PASSWORD_KEY, encode("token"));
        let err = CredentialRecord::from_secret(&secret).decode().unwrap_err();
        assert!(matches!(err, RelayError::DecodeError { secret, .. } if secret == "creds"));
    }

    #[test]
    fn test_decode_trims_whitespace_and_requires_utf8() {
        let secret = SecretObject::new("creds", "kabanero")
            .with_data(USERNAME_KEY, format!(" {}\n", encode("bot")))
            .with_data(PASSWORD_KEY, encode("token"));
        let credential = CredentialRecord::from_secret(&secret).decode().unwrap();
        assert_eq!(credential.username, "bot");

        let secret = SecretObject::new("creds", "kabanero")
            .with_data(USERNAME_KEY, encode("bot"))
            .with_data(PASSWORD_KEY, STANDARD.encode([0xff, 0xfe, 0xfd]));
        let err = CredentialRecord::from_secret(&secret).decode().unwrap_err();
        assert!(matches!(err, RelayError::DecodeError { secret, .. } if secret == "creds"));
    }

    #[test]
    fn test_cache_policy_from_secs() {
        assert_eq!(CachePolicy::from_secs(0), CachePolicy::Disabled);
        assert_eq!(CachePolicy::from_secs(30), CachePolicy::Ttl(Duration::from_secs(30)));
    }
}
