//! Server configuration.

use serde::{Deserialize, Serialize};

/// Namespace searched when none is configured.
pub const DEFAULT_NAMESPACE: &str = "kabanero";
/// Environment variable overriding the namespace.
pub const NAMESPACE_ENV: &str = "KUBE_NAMESPACE";
/// Environment variable overriding the collection index URL.
pub const INDEX_URL_ENV: &str = "KABANERO_INDEX_URL";

/// Server-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Namespace holding credential secrets and Kabanero resources.
    pub namespace: String,
    /// Path to `eventDefinitions.yaml`.
    pub provider_config: String,
    /// Event destination that webhooks are published to.
    pub webhook_destination: String,
    /// Shared secret for `X-Hub-Signature-256` verification.
    pub webhook_secret: Option<String>,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// How long a secret listing is reused; 0 lists on every lookup.
    pub credential_cache_secs: u64,
    /// Kubernetes API server URL. In-cluster configuration when unset.
    pub kube_api_url: Option<String>,
    /// Collection index URL. Looked up from the Kabanero resource when unset.
    pub index_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9080,
            namespace: DEFAULT_NAMESPACE.to_string(),
            provider_config: "eventDefinitions.yaml".to_string(),
            webhook_destination: "github".to_string(),
            webhook_secret: None,
            log_level: "info".to_string(),
            credential_cache_secs: 0,
            kube_api_url: None,
            index_url: None,
        }
    }
}

impl ServerConfig {
    /// Returns the `host:port` pair to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Applies overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(namespace) = get(NAMESPACE_ENV) {
            self.namespace = namespace;
        }
        if let Some(url) = get(INDEX_URL_ENV) {
            self.index_url = Some(url);
        }
        self
    }
}

/// Parses configuration from TOML text.
///
/// Only the `[server]` table is read; a missing table yields the defaults.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: toml::Value =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    let server: ServerConfig = config
        .get("server")
        .map(|v| toml::Value::try_into(v.clone()))
        .transpose()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?
        .unwrap_or_default();

    if server.provider_config.is_empty() {
        return Err(ConfigError::Invalid("provider_config must not be empty".to_string()));
    }
    Ok(server)
}

/// Loads configuration from a TOML file.
pub fn load_config(path: &str) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
    parse_config(&content)
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
