//! HTTP upstream client.

use async_trait::async_trait;
use fake_types::{Response, ResponseType};
use std::time::Duration;

use super::Upstream;
use crate::error::UpstreamError;

/// Calls upstreams over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Create a client whose calls fail after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Client`] if the TLS backend cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UpstreamError::Client)?;
        Ok(Self { client })
    }
}

fn is_http(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

/// Decode an upstream body.
///
/// Bodies that are not a response tree are kept as the node's message.
fn decode(code: u16, bytes: &[u8]) -> Response {
    match Response::from_json(bytes) {
        Ok(mut response) => {
            response.code = code;
            response
        }
        Err(_) => {
            let mut response = Response {
                kind: Some(ResponseType::Http),
                code,
                ..Response::default()
            };
            let text = String::from_utf8_lossy(bytes);
            if !text.trim().is_empty() {
                response.set_message(text.trim());
            }
            response
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn call(&self, uri: &str) -> Result<Response, UpstreamError> {
        if !is_http(uri) {
            return Err(UpstreamError::UnsupportedScheme {
                uri: uri.to_string(),
            });
        }

        let request_error = |source| UpstreamError::Request {
            uri: uri.to_string(),
            source,
        };

        tracing::debug!(uri, "Calling upstream");
        let reply = self.client.get(uri).send().await.map_err(request_error)?;
        let status = reply.status();
        let bytes = reply.bytes().await.map_err(request_error)?;

        let response = decode(status.as_u16(), &bytes);
        if status.is_success() {
            Ok(response)
        } else {
            tracing::warn!(uri, code = status.as_u16(), "Upstream returned an error");
            Err(UpstreamError::Status {
                uri: uri.to_string(),
                code: status.as_u16(),
                response: Some(Box::new(response)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_http_schemes_supported() {
        assert!(is_http("http://api:9090"));
        assert!(is_http("https://api.example.com/v1"));
        assert!(!is_http("grpc://api:9090"));
        assert!(!is_http("api:9090"));
    }

    #[tokio::test]
    async fn grpc_uri_rejected_without_network() {
        let upstream = HttpUpstream::new(Duration::from_secs(1)).unwrap();
        let err = upstream.call("grpc://currency:9090").await.unwrap_err();
        assert!(matches!(err, UpstreamError::UnsupportedScheme { .. }));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_request_error() {
        let upstream = HttpUpstream::new(Duration::from_millis(500)).unwrap();
        // Port 9 (discard) on localhost is closed in test environments
        let err = upstream.call("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Request { .. }));
        assert!(err.to_response().code >= 500);
    }

    #[test]
    fn decode_response_tree() {
        let body = json!({ "name": "db", "code": 0, "body": "ok" }).to_string();
        let response = decode(200, body.as_bytes());
        assert_eq!(response.name, "db");
        assert_eq!(response.code, 200);
        assert_eq!(response.body, Some(json!("ok")));
    }

    #[test]
    fn decode_plain_text_keeps_message() {
        let response = decode(502, b"bad gateway\n");
        assert_eq!(response.code, 502);
        assert_eq!(response.body, Some(json!("bad gateway")));
        assert!(response.name.is_empty());
    }

    #[test]
    fn decode_empty_body() {
        let response = decode(204, b"");
        assert_eq!(response.code, 204);
        assert!(response.body.is_none());
    }
}
