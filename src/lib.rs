pub mod backoff;
pub mod cli;
pub mod common_crawl_seeder;
pub mod config;
pub mod crawler;
pub mod ct_log_seeder;
pub mod export;
pub mod frontier;
pub mod logging;
pub mod models;
pub mod network;
pub mod parser;
pub mod retry;
pub mod robots;
pub mod scope;
pub mod seeder;
pub mod sitemap_seeder;
pub mod stats;
pub mod storage;
pub mod url_norm;

// Re-export main types for library usage
pub use backoff::BackoffPolicy;
pub use config::CrawlerConfig;
pub use crawler::{CrawlError, Crawler};
pub use frontier::Frontier;
pub use models::{CrawlSummary, PageResult, UrlItem};
pub use network::{FetchError, HttpClient};
pub use parser::extract_links;
pub use retry::RetryController;
pub use storage::Storage;
