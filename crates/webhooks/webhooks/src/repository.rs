//! Repository details carried in webhook bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{WebhookError, WebhookResult};

/// Webhook event kinds that identify a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryEvent {
    /// `push`: the ref is the flat `after` field.
    Push,
    /// `pull_request`: the ref is `pull_request.head.sha`.
    PullRequest,
    /// Any other event; no ref.
    Other(String),
}

impl RepositoryEvent {
    /// Classifies an `X-Github-Event` header value.
    pub fn from_name(name: &str) -> Self {
        match name {
            "push" => Self::Push,
            "pull_request" => Self::PullRequest,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct PushBody {
    after: Option<String>,
}

#[derive(Deserialize)]
struct PullRequestBody {
    pull_request: Option<PullRequest>,
}

#[derive(Deserialize)]
struct PullRequest {
    head: Option<Head>,
}

#[derive(Deserialize)]
struct Head {
    sha: Option<String>,
}

#[derive(Deserialize)]
struct RepositoryBody {
    repository: Option<Repository>,
}

#[derive(Deserialize)]
struct Repository {
    name: Option<String>,
    owner: Option<Owner>,
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct Owner {
    login: Option<String>,
}

/// Returns the commit the event refers to.
///
/// Events other than push and pull request yield an empty ref.
pub fn commit_ref(event: &RepositoryEvent, body: &Value) -> WebhookResult<String> {
    match event {
        RepositoryEvent::Push => PushBody::deserialize(body)?
            .after
            .ok_or_else(|| WebhookError::MissingField("after".to_string())),
        RepositoryEvent::PullRequest => PullRequestBody::deserialize(body)?
            .pull_request
            .ok_or_else(|| WebhookError::MissingField("pull_request".to_string()))?
            .head
            .ok_or_else(|| WebhookError::MissingField("pull_request.head".to_string()))?
            .sha
            .ok_or_else(|| WebhookError::MissingField("pull_request.head.sha".to_string())),
        RepositoryEvent::Other(_) => Ok(String::new()),
    }
}

/// Where a webhook came from and which commit it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub owner: String,
    pub name: String,
    pub html_url: String,
    pub git_ref: String,
}

impl RepositoryInfo {
    /// Extracts repository owner, name, URL, and ref from a webhook body.
    pub fn from_body(event: &RepositoryEvent, body: &Value) -> WebhookResult<Self> {
        let git_ref = commit_ref(event, body)?;
        let repository = RepositoryBody::deserialize(body)?
            .repository
            .ok_or_else(|| WebhookError::MissingField("repository".to_string()))?;

        let name = repository
            .name
            .ok_or_else(|| WebhookError::MissingField("repository.name".to_string()))?;
        let owner = repository
            .owner
            .and_then(|owner| owner.login)
            .ok_or_else(|| WebhookError::MissingField("repository.owner.login".to_string()))?;
        let html_url = repository
            .html_url
            .ok_or_else(|| WebhookError::MissingField("repository.html_url".to_string()))?;

        Ok(Self {
            owner,
            name,
            html_url,
            git_ref,
        })
    }
}
