//! Provider and endpoint definitions.
//!
//! Definitions are loaded once at startup from an `eventDefinitions.yaml`
//! document:
//!
//! ```yaml
//! messageProviders:
//!   - name: nats-provider
//!     providerType: nats
//!     url: nats://127.0.0.1:4222
//!     timeout: 8760h
//! eventDestinations:
//!   - name: github
//!     topic: github
//!     providerRef: nats-provider
//! eventSources:
//!   - name: github-source
//!     topic: github
//!     providerRef: nats-provider
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EventError, EventResult};

/// Receive window used when a provider definition omits `timeout`.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Static configuration for one transport backend instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDefinition {
    /// Name referenced by event nodes.
    pub name: String,
    /// Backend discriminator, e.g. `nats` or `memory`.
    pub provider_type: String,
    /// Connection endpoint.
    #[serde(default)]
    pub url: String,
    /// Upper bound for a synchronous `receive`.
    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,
}

impl ProviderDefinition {
    /// Creates a new provider definition with the default receive timeout.
    pub fn new(
        name: impl Into<String>,
        provider_type: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider_type: provider_type.into(),
            url: url.into(),
            timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }

    /// Sets the receive timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A named binding of a logical endpoint to a transport subject.
///
/// Whether a node is a destination or a source depends only on the list it
/// was declared in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNode {
    /// Logical endpoint name.
    pub name: String,
    /// Transport-level subject.
    pub topic: String,
    /// Name of the owning [`ProviderDefinition`].
    pub provider_ref: String,
}

impl EventNode {
    /// Creates a new event node.
    pub fn new(
        name: impl Into<String>,
        topic: impl Into<String>,
        provider_ref: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            topic: topic.into(),
            provider_ref: provider_ref.into(),
        }
    }
}

/// The full set of providers, destinations, and sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDefinitions {
    /// Transport backends.
    #[serde(default)]
    pub message_providers: Vec<ProviderDefinition>,
    /// Publish targets.
    #[serde(default)]
    pub event_destinations: Vec<EventNode>,
    /// Subscription targets.
    #[serde(default)]
    pub event_sources: Vec<EventNode>,
}

impl EventDefinitions {
    /// Creates an empty set of definitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider definition.
    pub fn with_provider(mut self, provider: ProviderDefinition) -> Self {
        self.message_providers.push(provider);
        self
    }

    /// Adds a destination node.
    pub fn with_destination(mut self, node: EventNode) -> Self {
        self.event_destinations.push(node);
        self
    }

    /// Adds a source node.
    pub fn with_source(mut self, node: EventNode) -> Self {
        self.event_sources.push(node);
        self
    }

    /// Parses and validates definitions from a YAML document.
    pub fn from_yaml_str(content: &str) -> EventResult<Self> {
        let definitions: Self = serde_yaml::from_str(content)?;
        definitions.validate()?;
        Ok(definitions)
    }

    /// Reads, parses, and validates definitions from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> EventResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EventError::config(format!("unable to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Checks name uniqueness and that every node references a known provider.
    pub fn validate(&self) -> EventResult<()> {
        let mut providers = HashSet::new();
        for provider in &self.message_providers {
            if provider.name.is_empty() {
                return Err(EventError::config("message provider with empty name"));
            }
            if !providers.insert(provider.name.as_str()) {
                return Err(EventError::config(format!(
                    "duplicate message provider '{}'",
                    provider.name
                )));
            }
        }

        for (kind, nodes) in [
            ("eventDestination", &self.event_destinations),
            ("eventSource", &self.event_sources),
        ] {
            let mut names = HashSet::new();
            for node in nodes {
                if !names.insert(node.name.as_str()) {
                    return Err(EventError::config(format!(
                        "duplicate {} '{}'",
                        kind, node.name
                    )));
                }
                if !providers.contains(node.provider_ref.as_str()) {
                    return Err(EventError::UnknownProvider(format!(
                        "{} '{}' references '{}'",
                        kind, node.name, node.provider_ref
                    )));
                }
            }
        }
        Ok(())
    }

    /// Looks up a provider definition by name.
    pub fn provider(&self, name: &str) -> Option<&ProviderDefinition> {
        self.message_providers.iter().find(|p| p.name == name)
    }

    /// Looks up a destination node by name.
    pub fn destination(&self, name: &str) -> Option<&EventNode> {
        self.event_destinations.iter().find(|n| n.name == name)
    }

    /// Looks up a source node by name.
    pub fn source(&self, name: &str) -> Option<&EventNode> {
        self.event_sources.iter().find(|n| n.name == name)
    }
}

fn default_timeout() -> Duration {
    DEFAULT_RECEIVE_TIMEOUT
}

/// Parses a duration such as `500ms`, `10s`, `2m`, `1h`, or `1h30m`.
///
/// A bare integer is read as seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];
        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];
        let part = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.checked_mul(60)?),
            "h" => Duration::from_secs(value.checked_mul(3600)?),
            _ => return None,
        };
        total = total.checked_add(part)?;
    }
    Some(total)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
        RawDuration::Text(text) => parse_duration(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{}'", text))),
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{}ms", duration.as_millis()))
}
