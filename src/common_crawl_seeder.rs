//! Seed URLs from the Common Crawl CDX index.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use url::Url;

use crate::network::HttpClient;
use crate::seeder::{Seeder, SeederError};
use crate::url_norm;

/// Bound on returned entries so a broad domain query stays manageable.
const RESULT_LIMIT: usize = 1000;

/// CDX index entry, one JSON object per response line.
#[derive(Debug, Deserialize)]
struct CdxEntry {
    url: String,
}

/// Collection descriptor from collinfo.json; the newest crawl is listed first.
#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

pub struct CommonCrawlSeeder {
    http: HttpClient,
}

impl CommonCrawlSeeder {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn latest_index_id(&self) -> Result<String, SeederError> {
        let response = self
            .http
            .fetch_text("https://index.commoncrawl.org/collinfo.json")
            .await?;
        if response.status != 200 {
            return Err(SeederError::Http(response.status));
        }

        let collections: Vec<CollectionInfo> = serde_json::from_str(&response.body)
            .map_err(|e| SeederError::Data(format!("unparseable collection info: {e}")))?;

        collections
            .first()
            .map(|c| c.id.clone())
            .ok_or_else(|| SeederError::Data("no collections listed".to_string()))
    }
}

#[async_trait]
impl Seeder for CommonCrawlSeeder {
    async fn seed(&self, start_url: &str) -> Result<Vec<String>, SeederError> {
        let parsed = Url::parse(start_url)
            .map_err(|e| SeederError::Data(format!("invalid start URL: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| SeederError::Data("start URL has no host".to_string()))?;
        let domain = url_norm::root_domain(host);

        let index_id = self.latest_index_id().await?;
        tracing::info!(index = %index_id, domain = %domain, "querying common crawl index");

        let query_url = format!(
            "https://index.commoncrawl.org/{index_id}-index?url=*.{domain}&output=json&limit={RESULT_LIMIT}"
        );
        let response = self.http.fetch_text(&query_url).await?;
        if response.status != 200 {
            return Err(SeederError::Http(response.status));
        }

        // One JSON object per line; skip lines that fail to parse.
        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for line in response.body.lines() {
            if line.is_empty() {
                continue;
            }
            let Ok(entry) = serde_json::from_str::<CdxEntry>(line) else {
                continue;
            };
            if !entry.url.is_empty() && seen.insert(entry.url.clone()) {
                urls.push(entry.url);
            }
            if urls.len() >= RESULT_LIMIT {
                break;
            }
        }

        tracing::info!(count = urls.len(), "common crawl index yielded URLs");
        Ok(urls)
    }

    fn name(&self) -> &'static str {
        "commoncrawl"
    }
}
