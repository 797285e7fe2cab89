//! Trait implemented by each seeding strategy (sitemap, CT log, Common Crawl)
//! to feed URLs into the frontier at depth 0.

use async_trait::async_trait;
use thiserror::Error;

use crate::network::FetchError;

#[derive(Debug, Error)]
pub enum SeederError {
    #[error("network: {0}")]
    Network(String),

    #[error("http {0}")]
    Http(u16),

    #[error("data: {0}")]
    Data(String),
}

impl From<FetchError> for SeederError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Body(msg) => SeederError::Data(msg),
            other => SeederError::Network(other.to_string()),
        }
    }
}

/// A seed source: given the start URL, discover candidate entry points.
///
/// Failures are non-fatal to the crawl; returned URLs pass through
/// normalization and the scope filter before entering the frontier at
/// depth 0.
#[async_trait]
pub trait Seeder: Send + Sync {
    async fn seed(&self, start_url: &str) -> Result<Vec<String>, SeederError>;

    /// Name used in logs to identify which seeder produced URLs.
    fn name(&self) -> &'static str;
}
