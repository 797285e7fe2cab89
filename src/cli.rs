use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// crawlmap cli
#[derive(Parser)]
#[command(name = "crawlmap")]
#[command(about = "A polite concurrent web crawler that maps sites into JSONL records")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new crawl
    Crawl {
        /// The starting URL to begin crawling from
        #[arg(long)]
        start_url: String,

        /// Number of concurrent workers (1-1000)
        #[arg(long, default_value_t = 256)]
        workers: usize,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 20)]
        timeout: u64,

        /// Directory for results, config, and logs
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Seeding strategy: none, sitemap, ct, commoncrawl, or all
        #[arg(long, default_value = "all")]
        seeding_strategy: String,

        /// Disable robots.txt compliance
        #[arg(long)]
        ignore_robots: bool,

        /// Maximum retry attempts per URL (0-10)
        #[arg(long, default_value_t = 3)]
        max_retries: u32,

        /// Follow links to hosts outside the start domain
        #[arg(long)]
        crawl_external_links: bool,
    },

    /// Resume a crawl from a persisted configuration
    Resume {
        /// Directory holding the previous crawl's config and results
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Export crawled results to sitemap.xml
    ExportSitemap {
        /// Directory containing crawled data
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Output sitemap XML file
        #[arg(long, default_value = "./sitemap.xml")]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_flags_parse_with_defaults() {
        let cli = Cli::try_parse_from([
            "crawlmap",
            "crawl",
            "--start-url",
            "https://test.local",
        ])
        .unwrap();

        match cli.command {
            Commands::Crawl {
                start_url,
                workers,
                timeout,
                seeding_strategy,
                ignore_robots,
                max_retries,
                crawl_external_links,
                ..
            } => {
                assert_eq!(start_url, "https://test.local");
                assert_eq!(workers, 256);
                assert_eq!(timeout, 20);
                assert_eq!(seeding_strategy, "all");
                assert!(!ignore_robots);
                assert_eq!(max_retries, 3);
                assert!(!crawl_external_links);
            }
            _ => panic!("expected crawl subcommand"),
        }
    }

    #[test]
    fn start_url_is_required() {
        assert!(Cli::try_parse_from(["crawlmap", "crawl"]).is_err());
    }

    #[test]
    fn export_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "crawlmap",
            "export-sitemap",
            "--data-dir",
            "./out",
            "--output",
            "./out/sitemap.xml",
        ])
        .unwrap();

        match cli.command {
            Commands::ExportSitemap { data_dir, output } => {
                assert_eq!(data_dir, PathBuf::from("./out"));
                assert_eq!(output, PathBuf::from("./out/sitemap.xml"));
            }
            _ => panic!("expected export-sitemap subcommand"),
        }
    }
}
