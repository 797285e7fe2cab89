use reqwest::{Client, Response};
use std::time::Duration;

use crate::config::CrawlerConfig;

/// Shared connection-pooling HTTP client used by workers, the robots cache,
/// and the seeders. Compressed responses (gzip, deflate, br) are decoded
/// transparently; the timeout covers the whole request and response cycle.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .pool_max_idle_per_host(CrawlerConfig::POOL_IDLE_PER_HOST)
            .pool_idle_timeout(CrawlerConfig::POOL_IDLE_TIMEOUT)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }

    /// Send a GET request and return the response with headers read but the
    /// body still pending. Body errors are the caller's to classify.
    pub async fn get(&self, url: &str) -> Result<Response, FetchError> {
        self.client
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(FetchError::from_reqwest)
    }

    /// Fetch a URL and buffer the body as text (robots.txt, seeder payloads).
    pub async fn fetch_text(&self, url: &str) -> Result<TextResponse, FetchError> {
        let response = self.get(url).await?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        Ok(TextResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TextResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timeout")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("dns resolution failed")]
    Dns,

    #[error("tls error: {0}")]
    Tls(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("failed to build http client: {0}")]
    ClientBuild(String),
}

impl FetchError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return FetchError::Timeout;
        }

        let message = error.to_string();
        let lower = message.to_lowercase();

        if error.is_connect() {
            if lower.contains("connection refused") {
                return FetchError::ConnectionRefused;
            }
            if lower.contains("dns") || lower.contains("name resolution") || lower.contains("no such host") {
                return FetchError::Dns;
            }
        }

        if lower.contains("certificate") || lower.contains("ssl") || lower.contains("tls") {
            return FetchError::Tls(message);
        }

        FetchError::Network(message)
    }
}
