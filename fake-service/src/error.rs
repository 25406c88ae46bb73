//! Error types for fake-service.

use fake_types::Response;

/// Main error type for fake-service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Load generator error.
    #[error("load generator error: {0}")]
    Generator(#[from] GeneratorError),

    /// Worker pool error.
    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),

    /// Upstream client error.
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load generator errors.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// A generation is already live on this generator.
    #[error("load generation already running")]
    AlreadyRunning,

    /// `generate` was called outside a Tokio runtime.
    #[error("load generation requires a Tokio runtime")]
    NoRuntime,
}

/// Worker pool errors.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Worker count must be at least one.
    #[error("worker count must be at least 1, got {0}")]
    WorkerCount(usize),

    /// A worker ended without reporting every task it took.
    #[error("worker pool lost tasks: {completed} of {total} completed")]
    Incomplete {
        /// Tasks with a result.
        completed: usize,
        /// Tasks submitted.
        total: usize,
    },
}

/// Upstream call errors.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// URI scheme has no client.
    #[error("unsupported upstream scheme: {uri}")]
    UnsupportedScheme {
        /// The URI that was rejected.
        uri: String,
    },

    /// Request could not be completed.
    #[error("request to {uri} failed: {source}")]
    Request {
        /// Upstream URI.
        uri: String,
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },

    /// Upstream answered with a non-success status.
    #[error("upstream {uri} returned status {code}")]
    Status {
        /// Upstream URI.
        uri: String,
        /// HTTP status code.
        code: u16,
        /// Decoded response tree, if the body was one.
        response: Option<Box<Response>>,
    },

    /// HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl UpstreamError {
    /// Response tree node describing this failure.
    ///
    /// A decoded upstream body is kept so that the failing subtree is still
    /// visible to the caller.
    pub fn to_response(&self) -> Response {
        let mut node = match self {
            Self::Status {
                response: Some(response),
                ..
            } => (**response).clone(),
            _ => Response::default(),
        };
        node.code = match self {
            Self::Status { code, .. } => *code,
            Self::Request { source, .. } if source.is_timeout() => 504,
            _ => 503,
        };
        node.error = Some(self.to_string());
        node
    }
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use fake_types::ResponseType;

    #[test]
    fn pool_error_display() {
        assert_eq!(
            PoolError::WorkerCount(0).to_string(),
            "worker count must be at least 1, got 0"
        );
        assert_eq!(
            PoolError::Incomplete {
                completed: 2,
                total: 3
            }
            .to_string(),
            "worker pool lost tasks: 2 of 3 completed"
        );
    }

    #[test]
    fn unsupported_scheme_becomes_503_node() {
        let err = UpstreamError::UnsupportedScheme {
            uri: "grpc://api:9090".into(),
        };
        let node = err.to_response();
        assert_eq!(node.code, 503);
        assert_eq!(
            node.error.as_deref(),
            Some("unsupported upstream scheme: grpc://api:9090")
        );
    }

    #[test]
    fn status_error_keeps_upstream_tree() {
        let mut upstream = Response::new("db", ResponseType::Http);
        upstream.code = 500;
        upstream.error = Some("disk full".into());

        let err = UpstreamError::Status {
            uri: "http://db:9090".into(),
            code: 500,
            response: Some(Box::new(upstream)),
        };
        let node = err.to_response();

        assert_eq!(node.name, "db");
        assert_eq!(node.code, 500);
        assert_eq!(
            node.error.as_deref(),
            Some("upstream http://db:9090 returned status 500")
        );
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ServiceError>();
    }
}
