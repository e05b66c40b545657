//! HTTP client utilities.
//!
//! Each adapter owns one [`HttpClient`]. The underlying pooled `reqwest`
//! client is built on first use and shared by every clone of the handle;
//! concurrent first calls build it exactly once.

use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::sources::SourceError;
use crate::utils::validate::truncate_chars;

/// Retry-After used when a 429 response carries no usable header
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Longest error body kept in client error messages
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Shared HTTP client with lazy initialisation
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<OnceCell<Client>>,
    user_agent: Arc<str>,
    timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new(timeout: Duration) -> Self {
        Self::with_user_agent(
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            timeout,
        )
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str, timeout: Duration) -> Self {
        Self {
            client: Arc::new(OnceCell::new()),
            user_agent: Arc::from(user_agent),
            timeout,
        }
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the underlying client, building it on first use
    pub async fn client(&self) -> Result<&Client, SourceError> {
        self.client
            .get_or_try_init(|| async {
                tracing::debug!("Building HTTP client (timeout {:?})", self.timeout);
                Client::builder()
                    .user_agent(self.user_agent.as_ref())
                    .timeout(self.timeout)
                    .connect_timeout(self.timeout.min(Duration::from_secs(10)))
                    .pool_idle_timeout(Duration::from_secs(90))
                    .build()
                    .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))
            })
            .await
    }

    /// Send a GET request and classify the outcome.
    ///
    /// Returns the response only for success statuses; every other outcome
    /// is mapped onto a [`SourceError`].
    pub async fn get(
        &self,
        service: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response, SourceError> {
        let client = self.client().await?;
        let response = client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.classify_send_error(service, e))?;

        classify_response(service, response).await
    }

    /// Map a transport-level reqwest error onto a [`SourceError`]
    pub fn classify_send_error(&self, service: &str, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout {
                service: service.to_string(),
                timeout: self.timeout,
            }
        } else {
            SourceError::Network(format!("{}: {}", service, err))
        }
    }
}

/// Turn a non-success response into the matching [`SourceError`]
pub async fn classify_response(service: &str, response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = parse_retry_after(response.headers());
        return Err(SourceError::RateLimit {
            service: service.to_string(),
            retry_after,
        });
    }

    if status.is_server_error() {
        return Err(SourceError::ExternalService {
            service: service.to_string(),
            message: format!("Server error: HTTP {}", status.as_u16()),
            status_code: Some(status.as_u16()),
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(SourceError::ExternalService {
        service: service.to_string(),
        message: format!(
            "Client error: HTTP {} - {}",
            status.as_u16(),
            truncate_chars(&body, MAX_ERROR_BODY_CHARS)
        ),
        status_code: Some(status.as_u16()),
    })
}

/// Read a delta-seconds `Retry-After` header, falling back to the default
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), DEFAULT_RETRY_AFTER_SECS);

        headers.insert(reqwest::header::RETRY_AFTER, "17".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), 17);

        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(parse_retry_after(&headers), DEFAULT_RETRY_AFTER_SECS);
    }

    #[tokio::test]
    async fn test_client_is_built_once() {
        let http = HttpClient::new(Duration::from_secs(5));
        let clone = http.clone();
        let a = http.client().await.unwrap() as *const Client;
        let b = clone.client().await.unwrap() as *const Client;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_status_classification() {
        let mut server = mockito::Server::new_async().await;
        let _limited = server
            .mock("GET", "/limited")
            .with_status(429)
            .with_header("retry-after", "12")
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/broken")
            .with_status(502)
            .create_async()
            .await;
        let _denied = server
            .mock("GET", "/denied")
            .with_status(403)
            .with_body("key invalid")
            .create_async()
            .await;

        let http = HttpClient::new(Duration::from_secs(5));

        let err = http
            .get("test", &format!("{}/limited", server.url()), &[])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SourceError::RateLimit {
                service: "test".into(),
                retry_after: 12
            }
        );

        let err = http
            .get("test", &format!("{}/broken", server.url()), &[])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(502));
        assert!(err.is_transient());

        let err = http
            .get("test", &format!("{}/denied", server.url()), &[])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(403));
        assert!(!err.is_transient());
        assert!(err.to_string().contains("key invalid"));
    }
}
