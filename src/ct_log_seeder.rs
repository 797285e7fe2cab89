//! Seed URLs by querying Certificate Transparency logs for subdomains.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::network::HttpClient;
use crate::seeder::{Seeder, SeederError};
use crate::url_norm;

const MAX_QUERY_RETRIES: u32 = 3;

/// Certificate Transparency log entry from crt.sh.
#[derive(Debug, Deserialize)]
struct CtLogEntry {
    name_value: String,
}

pub struct CtLogSeeder {
    http: HttpClient,
}

impl CtLogSeeder {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Seeder for CtLogSeeder {
    async fn seed(&self, start_url: &str) -> Result<Vec<String>, SeederError> {
        let parsed = Url::parse(start_url)
            .map_err(|e| SeederError::Data(format!("invalid start URL: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| SeederError::Data("start URL has no host".to_string()))?;
        let domain = url_norm::root_domain(host);

        let query_url = format!("https://crt.sh/?q=%.{domain}&output=json");
        tracing::info!(domain = %domain, "querying certificate transparency logs");

        // crt.sh sheds load with 503s; retry briefly before giving up.
        let mut attempt = 0;
        let response = loop {
            match self.http.fetch_text(&query_url).await {
                Ok(r) if r.status == 200 => break r,
                Ok(r) if r.status == 503 && attempt < MAX_QUERY_RETRIES => {
                    attempt += 1;
                    let pause = Duration::from_millis(1000 * 2u64.pow(attempt - 1));
                    tracing::debug!(attempt, ?pause, "ct log query returned 503, retrying");
                    tokio::time::sleep(pause).await;
                }
                Ok(r) => return Err(SeederError::Http(r.status)),
                Err(e) => return Err(e.into()),
            }
        };

        let entries: Vec<CtLogEntry> = serde_json::from_str(&response.body)
            .map_err(|e| SeederError::Data(format!("unparseable ct log response: {e}")))?;

        // crt.sh may return several newline-separated hostnames per record;
        // collapse duplicates and drop wildcards, which name no concrete host.
        let mut subdomains = HashSet::new();
        for entry in entries {
            for line in entry.name_value.lines() {
                let name = line.trim();
                if name.is_empty() || name.starts_with('*') {
                    continue;
                }
                let name = name.to_lowercase();
                if name == domain || name.ends_with(&format!(".{domain}")) {
                    subdomains.insert(name);
                }
            }
        }

        tracing::info!(count = subdomains.len(), "ct logs yielded unique subdomains");

        Ok(subdomains
            .into_iter()
            .map(|host| format!("https://{host}/"))
            .collect())
    }

    fn name(&self) -> &'static str {
        "ct"
    }
}
