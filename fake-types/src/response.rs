//! Response tree returned by every fake-service node.
//!
//! Each node describes one handled call. Calls the node made to its own
//! upstreams are nested under [`Response::upstream_calls`] in the order the
//! upstreams were configured, so a single response describes the whole call
//! tree below the node that was hit.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TypesError;

/// Transport over which a node was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    /// Plain HTTP.
    #[serde(rename = "HTTP")]
    Http,
    /// gRPC.
    #[serde(rename = "gRPC")]
    Grpc,
}

/// One node of the response tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Service name of the node.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// URI the parent used to reach this node (empty for the root).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    /// Transport used to reach this node.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResponseType>,
    /// Local addresses of the node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
    /// Time handling started (RFC 3339).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub start_time: String,
    /// Time handling finished (RFC 3339).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub end_time: String,
    /// Total handling time, human readable (e.g. `"102.4ms"`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub duration: String,
    /// Message body; absent when the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Responses from upstream calls, in configuration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstream_calls: Vec<Response>,
    /// Status code reported by the node.
    #[serde(default)]
    pub code: u16,
    /// Error description if the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Create an empty response for the named service.
    pub fn new(name: impl Into<String>, kind: ResponseType) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, TypesError> {
        serde_json::to_string(self).map_err(TypesError::Serialization)
    }

    /// Deserialize from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, TypesError> {
        serde_json::from_slice(bytes).map_err(TypesError::Deserialization)
    }

    /// Set the body from a configured message.
    ///
    /// Messages that look like a JSON object are embedded as JSON; anything
    /// else (or an object that fails to parse) is embedded as a JSON string.
    pub fn set_message(&mut self, message: &str) {
        let body = if message.trim_start().starts_with('{') {
            serde_json::from_str(message).unwrap_or_else(|_| Value::String(message.to_string()))
        } else {
            Value::String(message.to_string())
        };
        self.body = Some(body);
    }

    /// Append a single upstream response, recording the URI it was reached on.
    pub fn append_upstream(&mut self, uri: impl Into<String>, mut upstream: Response) {
        upstream.uri = uri.into();
        self.upstream_calls.push(upstream);
    }

    /// Append several upstream responses in order.
    pub fn append_upstreams<I, U>(&mut self, upstreams: I)
    where
        I: IntoIterator<Item = (U, Response)>,
        U: Into<String>,
    {
        for (uri, upstream) in upstreams {
            self.append_upstream(uri, upstream);
        }
    }

    /// Whether this node recorded an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
