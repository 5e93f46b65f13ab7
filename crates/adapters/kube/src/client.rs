//! Minimal Kubernetes REST client.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::{KubeError, KubeResult};

/// Directory where the service account credentials are mounted in a pod.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the API server.
#[derive(Clone, Default)]
pub struct KubeConfig {
    /// Base URL, e.g. `https://kubernetes.default.svc`.
    pub api_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// PEM-encoded CA bundle used to verify the API server.
    pub ca_pem: Option<Vec<u8>>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for KubeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ca_pem", &self.ca_pem.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl KubeConfig {
    /// Targets `api_url` without credentials.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Builds the configuration a pod gets from its service account.
    pub fn in_cluster() -> KubeResult<Self> {
        Self::from_service_account_dir(Path::new(SERVICE_ACCOUNT_DIR))
    }

    /// Like [`KubeConfig::in_cluster`], reading credentials from `dir`.
    pub fn from_service_account_dir(dir: &Path) -> KubeResult<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .unwrap_or_else(|_| "kubernetes.default.svc".to_string());
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());
        let host = if host.contains(':') {
            format!("[{}]", host)
        } else {
            host
        };

        let token_path = dir.join("token");
        let token = std::fs::read_to_string(&token_path).map_err(|e| {
            KubeError::Config(format!("unable to read {}: {}", token_path.display(), e))
        })?;
        let ca_pem = std::fs::read(dir.join("ca.crt")).ok();

        Ok(Self {
            api_url: format!("https://{}:{}", host, port),
            token: Some(token.trim().to_string()),
            ca_pem,
            timeout: None,
        })
    }
}

/// Issues authenticated GET requests against the API server.
#[derive(Debug, Clone)]
pub struct KubeClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl KubeClient {
    /// Creates a client from `config`.
    pub fn new(config: KubeConfig) -> KubeResult<Self> {
        if config.api_url.is_empty() {
            return Err(KubeError::Config("API server URL is empty".to_string()));
        }

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT));
        if let Some(pem) = &config.ca_pem {
            let certificate = reqwest::Certificate::from_pem(pem)
                .map_err(|e| KubeError::Config(format!("invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(certificate);
        }
        let http = builder
            .build()
            .map_err(|e| KubeError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    /// Returns the API server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GETs `path` and decodes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> KubeResult<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "kubernetes GET");

        let mut request = self.http.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(KubeError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| KubeError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}
