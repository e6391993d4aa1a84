//! HTTP transport abstraction for the feature service client.
//!
//! The [`AsyncHttpClient`] trait decouples the service client from
//! `reqwest` so tests can script responses without a network. The real
//! implementation is [`ReqwestClient`].
//!
//! Certificate handling is injected via [`TrustPolicy`]. The default is
//! full validation; [`TrustPolicy::TrustAnyHost`] disables it and exists
//! only for isolated dev/test setups against self-signed endpoints.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Transport-level HTTP failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Failed to construct the underlying client.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// Request did not complete (DNS, connect, timeout, TLS).
    #[error("request failed: {0}")]
    Request(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Server certificate validation policy.
///
/// The POC this client generalizes trusted any host unconditionally.
/// That shortcut is not carried forward: trust bypass must be selected
/// explicitly at construction time and is never the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustPolicy {
    /// Full certificate validation (default).
    #[default]
    Strict,
    /// Accept any server certificate. Dev/test configurations only.
    TrustAnyHost,
}

/// Trait for asynchronous HTTP operations against the feature service.
///
/// Implementors must be cheap to clone or share; the service client
/// holds one for the lifetime of a session.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the response body.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Performs an HTTP POST request with a JSON body.
    fn post_json(
        &self,
        url: &str,
        json_body: &str,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

/// Real HTTP client backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the given request timeout and trust policy.
    pub fn new(timeout: Duration, trust: TrustPolicy) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true);

        if trust == TrustPolicy::TrustAnyHost {
            warn!("certificate validation disabled (TrustAnyHost) - dev/test use only");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        trace!(url, "HTTP GET starting");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url, error = %e, is_timeout = e.is_timeout(), "HTTP request failed");
            TransportError::Request(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "HTTP error status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        debug!(url, bytes = bytes.len(), "HTTP GET complete");
        Ok(bytes.to_vec())
    }

    async fn post_json(&self, url: &str, json_body: &str) -> Result<Vec<u8>, TransportError> {
        trace!(url, "HTTP POST starting");

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(json_body.to_string())
            .send()
            .await
            .map_err(|e| {
                warn!(url, error = %e, "HTTP POST failed");
                TransportError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "HTTP error status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| TransportError::Body(e.to_string()))
    }
}

pub mod mock {
    //! Scripted HTTP client for tests.

    use super::{AsyncHttpClient, TransportError};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock HTTP client that replays scripted responses.
    ///
    /// Responses are keyed by URL suffix so tests don't depend on the
    /// base URL. Each matching response is consumed once unless marked
    /// repeatable; the most recently pushed match wins among repeats.
    #[derive(Clone, Default)]
    pub struct MockHttpClient {
        routes: Arc<Mutex<Vec<Route>>>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    struct Route {
        suffix: String,
        responses: VecDeque<Result<Vec<u8>, TransportError>>,
        repeat_last: bool,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Scripts a single response for URLs ending in `suffix`.
        pub fn respond(&self, suffix: &str, response: Result<Vec<u8>, TransportError>) {
            self.push(suffix, vec![response], false);
        }

        /// Scripts a sequence of responses; the last repeats forever.
        pub fn respond_seq(&self, suffix: &str, responses: Vec<Result<Vec<u8>, TransportError>>) {
            self.push(suffix, responses, true);
        }

        fn push(
            &self,
            suffix: &str,
            responses: Vec<Result<Vec<u8>, TransportError>>,
            repeat_last: bool,
        ) {
            self.routes.lock().unwrap().push(Route {
                suffix: suffix.to_string(),
                responses: responses.into(),
                repeat_last,
            });
        }

        /// URLs requested so far, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn serve(&self, url: &str) -> Result<Vec<u8>, TransportError> {
            self.requests.lock().unwrap().push(url.to_string());

            let mut routes = self.routes.lock().unwrap();
            for route in routes.iter_mut() {
                if !url.ends_with(&route.suffix) {
                    continue;
                }
                if route.responses.len() == 1 && route.repeat_last {
                    return route.responses[0].clone();
                }
                if let Some(response) = route.responses.pop_front() {
                    return response;
                }
            }
            Err(TransportError::Status {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    impl AsyncHttpClient for MockHttpClient {
        async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
            self.serve(url)
        }

        async fn post_json(&self, url: &str, _json_body: &str) -> Result<Vec<u8>, TransportError> {
            self.serve(url)
        }
    }
}
