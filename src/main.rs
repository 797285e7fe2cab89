use clap::Parser;
use std::time::Duration;

use crawlmap::cli::{Cli, Commands};
use crawlmap::config::CrawlerConfig;
use crawlmap::crawler::Crawler;
use crawlmap::{export, logging, url_norm};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Crawl {
            start_url,
            workers,
            timeout,
            data_dir,
            seeding_strategy,
            ignore_robots,
            max_retries,
            crawl_external_links,
        } => {
            let config = CrawlerConfig {
                start_url: url_norm::normalize_start_url(&start_url),
                workers,
                timeout: Duration::from_secs(timeout),
                data_dir,
                seeding_strategy,
                ignore_robots,
                max_retries,
                crawl_external_links,
            };

            let _guard = logging::init(&config.data_dir)?;
            let crawler = Crawler::new(config)?;
            run_crawl(crawler).await
        }

        Commands::Resume { data_dir } => {
            let _guard = logging::init(&data_dir)?;
            let crawler = Crawler::resume(&data_dir)?;
            run_crawl(crawler).await
        }

        Commands::ExportSitemap { data_dir, output } => {
            let count = export::export_sitemap(&data_dir, &output)?;
            println!("exported {} URLs to {}", count, output.display());
            Ok(())
        }
    }
}

async fn run_crawl(crawler: Crawler) -> Result<(), Box<dyn std::error::Error>> {
    // First ctrl-c requests a graceful stop; in-flight pages still finish.
    let token = crawler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            token.cancel();
        }
    });

    let summary = crawler.crawl().await?;

    println!("crawl completed: {summary}");
    println!("success rate: {:.1}%", summary.success_rate() * 100.0);
    Ok(())
}
