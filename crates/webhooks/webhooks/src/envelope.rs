//! The header and body wrapper published for every inbound webhook.

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::WebhookResult;

/// Header naming the webhook event type.
pub const EVENT_HEADER: &str = "X-Github-Event";
/// Header present on deliveries from a GitHub Enterprise host.
pub const ENTERPRISE_HOST_HEADER: &str = "X-Github-Enterprise-Host";

/// A webhook request as moved through the transport.
///
/// Serialized as `{"header": {"Name": ["value", ...]}, "body": {...}}`.
/// Header names are stored in canonical MIME form, e.g. `X-Github-Event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub header: BTreeMap<String, Vec<String>>,
    pub body: Value,
}

impl Envelope {
    /// Creates an envelope from an already canonical header map.
    pub fn new(header: BTreeMap<String, Vec<String>>, body: Value) -> Self {
        Self { header, body }
    }

    /// Creates an envelope from HTTP request headers and a JSON object body.
    pub fn from_request(headers: &HeaderMap, body: Map<String, Value>) -> Self {
        let mut header: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in headers {
            header
                .entry(canonical_header_key(name.as_str()))
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        Self {
            header,
            body: Value::Object(body),
        }
    }

    /// Returns the first value of header `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header
            .get(&canonical_header_key(name))
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the webhook event type, e.g. `push`.
    pub fn event_type(&self) -> Option<&str> {
        self.header(EVENT_HEADER)
    }

    /// Returns the enterprise host the webhook came from, if any.
    pub fn enterprise_host(&self) -> Option<&str> {
        self.header(ENTERPRISE_HOST_HEADER)
    }

    /// Serializes the envelope for the transport.
    pub fn to_bytes(&self) -> WebhookResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses an envelope received from the transport.
    pub fn from_slice(payload: &[u8]) -> WebhookResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Converts a header name to canonical MIME form: the first letter and any
/// letter following a hyphen are upper case, the rest lower case.
pub fn canonical_header_key(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_canonical_header_key() {
        assert_eq!(canonical_header_key("x-github-event"), "X-Github-Event");
        assert_eq!(canonical_header_key("CONTENT-TYPE"), "Content-Type");
        assert_eq!(canonical_header_key("accept"), "Accept");
    }

    #[test]
    fn test_from_request() {
        let mut headers = HeaderMap::new();
        headers.insert("x-github-event", HeaderValue::from_static("push"));
        headers.append("accept", HeaderValue::from_static("a"));
        headers.append("accept", HeaderValue::from_static("b"));

        let body = serde_json::json!({ "after": "abc" });
        let envelope = Envelope::from_request(&headers, body.as_object().cloned().unwrap());

        assert_eq!(envelope.event_type(), Some("push"));
        assert_eq!(envelope.header["Accept"], vec!["a", "b"]);
        assert_eq!(envelope.enterprise_host(), None);

        let wire: Value = serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(wire["header"]["X-Github-Event"][0], "push");
        assert_eq!(wire["body"]["after"], "abc");
    }
}
