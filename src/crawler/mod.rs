//! Crawler module for following a chain of chapter pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and content extraction
//! - Request pacing with bounded retries
//! - The page chain state machine

mod coordinator;
mod fetcher;
mod pacing;
mod parser;

pub use coordinator::{
    same_page, CrawlAbort, CrawlOutcome, CrawlReport, CrawlSettings, CrawlTarget,
    PageChainCrawler,
};
pub use fetcher::{
    build_http_client, ExtractionRules, FetchError, HttpPageFetcher, PageExtraction, PageFetcher,
};
pub use pacing::{wait, Pacing};
pub use parser::{extract_page, rendered_text};

use crate::archive::DirectoryArchiver;
use crate::config::Config;
use crate::robots::check_crawl_policy;
use crate::ChainError;
use std::path::Path;
use tokio_util::sync::CancellationToken;

impl CrawlSettings {
    /// Builds crawl settings from the crawl section of the configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            rules: ExtractionRules::new(
                config.crawl.content_selector.clone(),
                config.crawl.next_selector.clone(),
            ),
            pacing: Pacing::from_config(&config.crawl),
            max_pages: config.crawl.max_pages,
        }
    }
}

/// Runs a complete crawl into the configured pages directory
///
/// This is the main entry point for crawling. It will:
/// 1. Build the HTTP client
/// 2. Consult robots.txt for the start URL
/// 3. Open the archive directory
/// 4. Follow the chain from start to end URL
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `target` - Start and end URLs
/// * `fresh` - Clear pages left in the archive directory by an earlier crawl
/// * `cancel` - Stops the crawl between pages when cancelled
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl completed or was cancelled
/// * `Err(CrawlAbort)` - The crawl failed; pages saved so far are reported
pub async fn crawl(
    config: &Config,
    target: &CrawlTarget,
    fresh: bool,
    cancel: CancellationToken,
) -> Result<CrawlReport, CrawlAbort> {
    let abort = |error: ChainError| CrawlAbort {
        pages: Vec::new(),
        error,
    };

    let client = build_http_client(&config.http).map_err(|e| abort(e.into()))?;

    let verdict = check_crawl_policy(
        &client,
        target.start_url(),
        &config.http.user_agent,
        config.crawl.robots_policy,
    )
    .await
    .map_err(abort)?;

    let mut settings = CrawlSettings::from_config(config);
    if let Some(crawl_delay) = verdict.crawl_delay() {
        tracing::info!("robots.txt asks for a crawl delay of {:?}", crawl_delay);
        settings.pacing = settings.pacing.with_crawl_delay(crawl_delay);
    }

    let archiver = DirectoryArchiver::open(Path::new(&config.output.pages_dir), fresh)
        .map_err(|e| abort(e.into()))?;

    let fetcher = HttpPageFetcher::new(client);
    let mut crawler = PageChainCrawler::new(fetcher, archiver, settings, cancel);
    crawler.run(target).await
}
