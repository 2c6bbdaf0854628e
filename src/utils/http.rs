//! HTTP client utilities.

use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;

/// Default per-request timeout for full search queries
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-request timeout for lightweight lookups
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared HTTP client with a fixed per-request timeout.
///
/// One client is created per source and reused across its calls for
/// connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with the search timeout
    pub fn new() -> Result<Self, SourceError> {
        Self::with_timeout(SEARCH_TIMEOUT)
    }

    /// Create a new HTTP client with a custom per-request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            timeout,
        })
    }

    /// Start a GET request carrying this client's timeout
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url).timeout(self.timeout)
    }

    /// Start a POST request carrying this client's timeout
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url).timeout(self.timeout)
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Send a request and return the body of a 2xx response.
///
/// Transport errors and non-2xx statuses both become [`SourceError`]s
/// naming `source`.
pub async fn fetch_text(request: RequestBuilder, source: &str) -> Result<String, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::Network(format!("Failed to query {}: {}", source, e)))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(SourceError::Api(format!(
            "{} returned status {}: {}",
            source,
            status,
            text.chars().take(200).collect::<String>()
        )));
    }

    response
        .text()
        .await
        .map_err(|e| SourceError::Network(format!("Failed to read {} response: {}", source, e)))
}

/// Check an endpoint override: an absolute http(s) URL.
pub fn validate_endpoint(endpoint: &str) -> Result<String, SourceError> {
    let parsed = url::Url::parse(endpoint)
        .map_err(|e| SourceError::InvalidRequest(format!("invalid endpoint '{}': {}", endpoint, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(endpoint.to_string()),
        scheme => Err(SourceError::InvalidRequest(format!(
            "invalid endpoint scheme '{}' in '{}'",
            scheme, endpoint
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("http://127.0.0.1:8080/cdx").is_ok());
        assert!(validate_endpoint("https://web.archive.org/cdx/search/cdx").is_ok());
        assert!(validate_endpoint("web.archive.org/cdx").is_err());
        assert!(validate_endpoint("ftp://example.com/cdx").is_err());
    }

    #[test]
    fn test_client_keeps_timeout() {
        let client = HttpClient::with_timeout(LOOKUP_TIMEOUT).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(5));

        let client = HttpClient::new().unwrap();
        assert_eq!(client.timeout(), SEARCH_TIMEOUT);
    }
}
