//! Mock upstream for testing.
//!
//! Answers from canned responses and records every call for verification.

use super::Upstream;
use crate::error::UpstreamError;
use async_trait::async_trait;
use fake_types::{Response, ResponseType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Mock upstream for testing.
///
/// Unknown URIs answer with a 200 node named after the URI.
#[derive(Debug, Default)]
pub struct MockUpstream {
    inner: Arc<Mutex<MockUpstreamInner>>,
}

#[derive(Debug, Default)]
struct MockUpstreamInner {
    responses: HashMap<String, Response>,
    failures: HashMap<String, u16>,
    delays: HashMap<String, Duration>,
    calls: Vec<String>,
}

impl MockUpstream {
    /// Create a new mock upstream.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, MockUpstreamInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer calls to `uri` with `response`.
    pub fn respond(&self, uri: &str, response: Response) {
        self.inner().responses.insert(uri.to_string(), response);
    }

    /// Fail calls to `uri` with status `code`.
    pub fn fail(&self, uri: &str, code: u16) {
        self.inner().failures.insert(uri.to_string(), code);
    }

    /// Delay calls to `uri` by `delay` before answering.
    pub fn delay(&self, uri: &str, delay: Duration) {
        self.inner().delays.insert(uri.to_string(), delay);
    }

    /// URIs called so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.inner().calls.clone()
    }
}

impl Clone for MockUpstream {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn call(&self, uri: &str) -> Result<Response, UpstreamError> {
        let delay = {
            let mut inner = self.inner();
            inner.calls.push(uri.to_string());
            inner.delays.get(uri).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.inner();
        if let Some(&code) = inner.failures.get(uri) {
            return Err(UpstreamError::Status {
                uri: uri.to_string(),
                code,
                response: None,
            });
        }

        Ok(inner.responses.get(uri).cloned().unwrap_or_else(|| {
            let mut response = Response::new(uri, ResponseType::Http);
            response.code = 200;
            response
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn canned_and_default_responses() {
        let mock = MockUpstream::new();
        let mut db = Response::new("db", ResponseType::Http);
        db.code = 200;
        mock.respond("http://db", db);

        assert_eq!(mock.call("http://db").await.unwrap().name, "db");
        assert_eq!(mock.call("http://cache").await.unwrap().name, "http://cache");
        assert_eq!(mock.calls(), vec!["http://db", "http://cache"]);
    }

    #[tokio::test]
    async fn failure_carries_code() {
        let mock = MockUpstream::new();
        mock.fail("http://db", 503);

        let err = mock.call("http://db").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { code: 503, .. }));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let mock = MockUpstream::new();
        let clone = mock.clone();
        clone.call("http://a").await.unwrap();
        assert_eq!(mock.calls(), vec!["http://a"]);
    }
}
