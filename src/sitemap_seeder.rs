//! Pre-seed the crawl queue from robots.txt sitemap declarations and sitemap indexes.

use async_trait::async_trait;
use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::collections::{HashSet, VecDeque};
use std::io::Cursor;
use url::Url;

use crate::network::HttpClient;
use crate::seeder::{Seeder, SeederError};

/// Sitemap files fetched per seeding pass, indexes included.
const MAX_SITEMAP_FETCHES: usize = 50;

const COMMON_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml", "/sitemap-index.xml"];

pub struct SitemapSeeder {
    http: HttpClient,
}

impl SitemapSeeder {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Sitemap URLs declared in robots.txt, if any.
    async fn declared_sitemaps(&self, origin: &str) -> Vec<String> {
        let robots_url = format!("{origin}/robots.txt");
        match self.http.fetch_text(&robots_url).await {
            Ok(response) if response.status == 200 => response
                .body
                .lines()
                .filter(|line| line.trim().to_lowercase().starts_with("sitemap:"))
                .filter_map(|line| line.split_once(':').map(|(_, rest)| rest.trim().to_string()))
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn parse_sitemap(xml: &str) -> (Vec<String>, Vec<String>) {
        let mut page_urls = Vec::new();
        let mut nested_sitemaps = Vec::new();

        for entity in SiteMapReader::new(Cursor::new(xml.as_bytes())) {
            match entity {
                SiteMapEntity::Url(entry) => {
                    if let Some(loc) = entry.loc.get_url() {
                        page_urls.push(loc.to_string());
                    }
                }
                SiteMapEntity::SiteMap(entry) => {
                    if let Some(loc) = entry.loc.get_url() {
                        nested_sitemaps.push(loc.to_string());
                    }
                }
                _ => {}
            }
        }

        (page_urls, nested_sitemaps)
    }
}

#[async_trait]
impl Seeder for SitemapSeeder {
    async fn seed(&self, start_url: &str) -> Result<Vec<String>, SeederError> {
        let parsed = Url::parse(start_url)
            .map_err(|e| SeederError::Data(format!("invalid start URL: {e}")))?;
        let origin = parsed.origin().ascii_serialization();

        let mut pending: VecDeque<String> = self.declared_sitemaps(&origin).await.into();
        if pending.is_empty() {
            tracing::debug!("no sitemaps declared in robots.txt, probing common paths");
            pending.extend(COMMON_PATHS.iter().map(|path| format!("{origin}{path}")));
        } else {
            tracing::info!(count = pending.len(), "found sitemaps in robots.txt");
        }

        let mut visited = HashSet::new();
        let mut urls = Vec::new();

        // Walk sitemap indexes breadth-first, bounded so a pathological index
        // tree cannot stall seeding.
        while let Some(sitemap_url) = pending.pop_front() {
            if !visited.insert(sitemap_url.clone()) {
                continue;
            }
            if visited.len() > MAX_SITEMAP_FETCHES {
                tracing::warn!(
                    limit = MAX_SITEMAP_FETCHES,
                    "sitemap fetch limit reached, stopping discovery early"
                );
                break;
            }

            let xml = match self.http.fetch_text(&sitemap_url).await {
                Ok(response) if response.status == 200 => response.body,
                Ok(response) => {
                    tracing::debug!(url = %sitemap_url, status = response.status, "sitemap fetch skipped");
                    continue;
                }
                Err(e) => {
                    tracing::debug!(url = %sitemap_url, error = %e, "sitemap fetch failed");
                    continue;
                }
            };

            let (page_urls, nested) = Self::parse_sitemap(&xml);
            tracing::debug!(url = %sitemap_url, pages = page_urls.len(), nested = nested.len(), "parsed sitemap");
            urls.extend(page_urls);
            pending.extend(nested);
        }

        Ok(urls)
    }

    fn name(&self) -> &'static str {
        "sitemap"
    }
}
