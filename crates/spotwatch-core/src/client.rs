//! Instance metadata HTTP client.
//!
//! Uses async reqwest internally, but presents a blocking interface so the
//! poller can run on a plain thread with a fixed cadence.

use std::sync::LazyLock;
use std::time::Duration;

use crate::error::FetchError;

/// Per-request timeout (must stay below the poll interval)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared tokio runtime for metadata requests.
///
/// One worker is enough: at most one request is in flight at a time.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("spotwatch-http")
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Raw metadata response: status and body, uninterpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataResponse {
    pub status: u16,
    pub body: String,
}

impl MetadataResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Bounded-timeout GET against the metadata service
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl MetadataClient {
    /// Build a client whose requests (connect + response + body) are capped at `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            // Metadata endpoints are link-local; never route them through a proxy
            .no_proxy()
            .build()
            .map_err(|e| FetchError::from_reqwest(&e))?;
        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// HTTP GET → (status, body).
    ///
    /// Every status is returned as a response; only transport failures are errors.
    /// Must not be called from inside a tokio runtime.
    pub fn fetch(&self, url: &str) -> Result<MetadataResponse, FetchError> {
        SHARED_RUNTIME.handle().block_on(async {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::from_reqwest(&e))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| FetchError::from_reqwest(&e))?;

            log::trace!("GET {url} -> {status} ({} bytes)", body.len());
            Ok(MetadataResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> MetadataResponse {
        MetadataResponse {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn success_range() {
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(404).is_success());
        assert!(!response(500).is_success());
    }

    #[test]
    fn not_found() {
        assert!(response(404).is_not_found());
        assert!(!response(200).is_not_found());
    }

    #[test]
    fn client_keeps_timeout() {
        let client = MetadataClient::new(Duration::from_millis(250)).unwrap();
        assert_eq!(client.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn connection_refused_is_transport_error() {
        // Bind then drop to get a port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = MetadataClient::new(Duration::from_secs(1)).unwrap();
        let err = client
            .fetch(&format!("http://127.0.0.1:{port}/latest/meta-data/"))
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Transport { .. } | FetchError::Timeout
        ));
    }
}
