//! Upstream clients.
//!
//! An upstream is any service called during request handling. Each call
//! produces one node of the response tree:
//! - [`HttpUpstream`] calls `http://` and `https://` URIs with reqwest
//! - [`MockUpstream`] answers from canned responses for testing
//!
//! Errors are per call and never abort the other calls of a request. The
//! caller turns them into tree nodes with [`UpstreamError::to_response`].

mod http;
mod mock;

pub use http::HttpUpstream;
pub use mock::MockUpstream;

use async_trait::async_trait;
use fake_types::Response;

use crate::error::UpstreamError;

/// Client for the services called while handling a request.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Call `uri` and return its response tree.
    ///
    /// The returned node does not need its `uri` set; the caller records it.
    async fn call(&self, uri: &str) -> Result<Response, UpstreamError>;
}
