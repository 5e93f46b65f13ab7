//! Downloads files from the repository a webhook came from.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hookrelay_core::CredentialResolver;
use serde::Deserialize;
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::{WebhookError, WebhookResult};
use crate::repository::{RepositoryEvent, RepositoryInfo};

/// Contents API root for github.com.
pub const GITHUB_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("hookrelay/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct FileContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Fetches repository files through the GitHub contents API, authenticated
/// with the credential resolved for the repository URL.
pub struct RepositoryFileFetcher {
    client: reqwest::Client,
    credentials: Arc<CredentialResolver>,
    api_url: Option<String>,
}

impl RepositoryFileFetcher {
    /// Creates a fetcher using `credentials`.
    pub fn new(credentials: Arc<CredentialResolver>) -> WebhookResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            credentials,
            api_url: None,
        })
    }

    /// Sends every request to `api_url` instead of the host-derived API root.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Returns the API root for a webhook from `enterprise_host`, or from
    /// github.com when there is none.
    pub fn api_root(&self, enterprise_host: Option<&str>) -> String {
        if let Some(url) = &self.api_url {
            return url.clone();
        }
        match enterprise_host {
            Some(host) => format!("https://{}/api/v3", host),
            None => GITHUB_API_URL.to_string(),
        }
    }

    /// Downloads `path` from the repository described by `info`.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub async fn download_file(
        &self,
        info: &RepositoryInfo,
        path: &str,
        enterprise_host: Option<&str>,
    ) -> WebhookResult<Option<Vec<u8>>> {
        let credential = self.credentials.resolve(&info.html_url).await?;
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_root(enterprise_host),
            info.owner,
            info.name,
            path.trim_start_matches('/')
        );
        tracing::debug!(%url, git_ref = %info.git_ref, "downloading repository file");

        let mut request = self
            .client
            .get(&url)
            .basic_auth(&credential.username, Some(&credential.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT);
        if !info.git_ref.is_empty() {
            request = request.query(&[("ref", info.git_ref.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let display_path = format!("{}/{}/{}", info.owner, info.name, path);
        match status {
            200 => {}
            400 | 404 => {
                tracing::debug!(path = %display_path, status, "file does not exist");
                return Ok(None);
            }
            _ => {
                return Err(WebhookError::UnexpectedStatus {
                    path: display_path,
                    status,
                });
            }
        }

        let body: Value = response.json().await?;
        let file: FileContent = match body {
            Value::Object(_) => serde_json::from_value(body)?,
            _ => {
                return Err(WebhookError::InvalidPayload(format!(
                    "unable to download {}: not a file",
                    display_path
                )));
            }
        };
        if file.kind != "file" {
            return Err(WebhookError::InvalidPayload(format!(
                "unable to download {}: not a file",
                display_path
            )));
        }
        let content = file.content.ok_or_else(|| {
            WebhookError::InvalidPayload(format!("content for {} is nil", display_path))
        })?;

        match file.encoding.as_deref() {
            Some("base64") => {
                let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = STANDARD.decode(compact).map_err(|e| {
                    WebhookError::InvalidPayload(format!("{}: {}", display_path, e))
                })?;
                Ok(Some(bytes))
            }
            _ => Ok(Some(content.into_bytes())),
        }
    }

    /// Downloads `path` from the repository a webhook envelope came from and
    /// parses it as YAML.
    pub async fn download_yaml(&self, envelope: &Envelope, path: &str) -> WebhookResult<Option<Value>> {
        let event = envelope
            .event_type()
            .map(RepositoryEvent::from_name)
            .ok_or_else(|| WebhookError::MissingField("X-Github-Event header".to_string()))?;
        let info = RepositoryInfo::from_body(&event, &envelope.body)?;

        match self.download_file(&info, path, envelope.enterprise_host()).await? {
            Some(bytes) => Ok(Some(serde_yaml::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookrelay_adapter_memory::MemorySecretStore;

    fn fetcher() -> RepositoryFileFetcher {
        let store = Arc::new(MemorySecretStore::new());
        RepositoryFileFetcher::new(Arc::new(CredentialResolver::new(store, "kabanero"))).unwrap()
    }

    #[test]
    fn test_api_root() {
        let fetcher = fetcher();
        assert_eq!(fetcher.api_root(None), "https://api.github.com");
        assert_eq!(
            fetcher.api_root(Some("github.ibm.com")),
            "https://github.ibm.com/api/v3"
        );

        let fetcher = fetcher.with_api_url("http://127.0.0.1:9999/");
        assert_eq!(fetcher.api_root(Some("github.ibm.com")), "http://127.0.0.1:9999");
    }
}
