//! Crawler coordinator - the page chain state machine
//!
//! This module contains the main crawl loop, which:
//! - Fetches the current page, retrying transient failures with backoff
//! - Archives the page's text in strict fetch order
//! - Follows the first forward link until the end URL has been archived
//! - Stops between pages when cancelled, keeping everything archived so far

use crate::archive::{derive_identifier, ArchivedPage, PageArchiver, SavedPage};
use crate::crawler::fetcher::{ExtractionRules, FetchError, PageExtraction, PageFetcher};
use crate::crawler::pacing::{wait, Pacing};
use crate::ChainError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Where a crawl starts and where it stops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    start_url: String,
    end_url: String,
}

impl CrawlTarget {
    /// Creates a target from trimmed start and end URLs
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlTarget)` - Both URLs are non-empty after trimming
    /// * `Err(ChainError::InvalidTarget)` - Either URL is empty
    pub fn new(start_url: &str, end_url: &str) -> Result<Self, ChainError> {
        let start_url = start_url.trim();
        let end_url = end_url.trim();

        if start_url.is_empty() {
            return Err(ChainError::InvalidTarget("start URL is empty".to_string()));
        }
        if end_url.is_empty() {
            return Err(ChainError::InvalidTarget("end URL is empty".to_string()));
        }

        Ok(Self {
            start_url: start_url.to_string(),
            end_url: end_url.to_string(),
        })
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    pub fn end_url(&self) -> &str {
        &self.end_url
    }
}

/// Settings for one crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub rules: ExtractionRules,
    pub pacing: Pacing,
    /// Maximum pages to archive; 0 means unlimited
    pub max_pages: u32,
}

/// How a crawl that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The end URL was fetched and archived
    Completed,
    /// A stop was requested between pages
    Cancelled,
}

/// Result of a crawl that ended without a fatal error
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Archived pages in fetch order
    pub pages: Vec<SavedPage>,
    pub outcome: CrawlOutcome,
    /// Failed attempts that were retried
    pub retries: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == CrawlOutcome::Completed
    }
}

/// A crawl aborted by a fatal error
///
/// Pages archived before the failure stay on disk and are listed here so the
/// caller can decide whether to bind a partial book.
#[derive(Debug)]
pub struct CrawlAbort {
    pub pages: Vec<SavedPage>,
    pub error: ChainError,
}

impl fmt::Display for CrawlAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages saved before failure: {}",
            self.pages.len(),
            self.error
        )
    }
}

impl std::error::Error for CrawlAbort {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Mutable state of the crawl loop
struct CrawlState {
    current_url: String,
    reached_end: bool,
    page_count: u32,
    visited: HashSet<String>,
}

/// Outcome of fetching one URL with retries
enum FetchStep {
    /// First text block and the forward links of a non-empty extraction
    Fetched {
        content: String,
        forward_links: Vec<String>,
    },
    Cancelled,
}

/// Sequential crawler following a chain of "next" links
///
/// Each page is fully fetched, extracted and archived before the next URL is
/// known, so there is never more than one request in flight.
pub struct PageChainCrawler<F, A> {
    fetcher: F,
    archiver: A,
    settings: CrawlSettings,
    cancel: CancellationToken,
    retries: u32,
}

impl<F, A> PageChainCrawler<F, A>
where
    F: PageFetcher,
    A: PageArchiver,
{
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Loads pages and extracts content and forward links
    /// * `archiver` - Durably stores each page's text
    /// * `settings` - Selectors, pacing and page limit
    /// * `cancel` - Token checked between pages and during waits
    pub fn new(fetcher: F, archiver: A, settings: CrawlSettings, cancel: CancellationToken) -> Self {
        Self {
            fetcher,
            archiver,
            settings,
            cancel,
            retries: 0,
        }
    }

    /// Gives the archiver back once crawling is done
    pub fn into_archiver(self) -> A {
        self.archiver
    }

    /// Runs the crawl loop from `target.start_url` through `target.end_url`
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The end page was archived, or the crawl was
    ///   cancelled between pages
    /// * `Err(CrawlAbort)` - A fatal error stopped the crawl; the pages
    ///   archived up to that point are included
    pub async fn run(&mut self, target: &CrawlTarget) -> Result<CrawlReport, CrawlAbort> {
        let started_at = Utc::now();
        self.retries = 0;
        let mut pages = Vec::new();

        match self.crawl_chain(target, &mut pages).await {
            Ok(outcome) => {
                tracing::info!(
                    "Crawl {}: {} pages archived, {} retries",
                    match outcome {
                        CrawlOutcome::Completed => "completed",
                        CrawlOutcome::Cancelled => "cancelled",
                    },
                    pages.len(),
                    self.retries
                );
                Ok(CrawlReport {
                    pages,
                    outcome,
                    retries: self.retries,
                    started_at,
                    finished_at: Utc::now(),
                })
            }
            Err(error) => {
                tracing::error!("Crawl aborted after {} pages: {}", pages.len(), error);
                Err(CrawlAbort { pages, error })
            }
        }
    }

    async fn crawl_chain(
        &mut self,
        target: &CrawlTarget,
        pages: &mut Vec<SavedPage>,
    ) -> Result<CrawlOutcome, ChainError> {
        let mut state = CrawlState {
            current_url: target.start_url().to_string(),
            reached_end: same_page(target.start_url(), target.end_url()),
            page_count: 0,
            visited: HashSet::new(),
        };
        state.visited.insert(page_key(&state.current_url));

        tracing::info!(
            "Crawling from {} to {}",
            target.start_url(),
            target.end_url()
        );

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!("Stop requested, halting before {}", state.current_url);
                return Ok(CrawlOutcome::Cancelled);
            }

            if state.page_count > 0 {
                let delay = self.settings.pacing.politeness_delay();
                tracing::debug!("Waiting {:?} before next page", delay);
                if !wait(delay, &self.cancel).await {
                    continue;
                }
            }

            let (content, forward_links) = match self.fetch_with_retry(&state.current_url).await? {
                FetchStep::Fetched {
                    content,
                    forward_links,
                } => (content, forward_links),
                FetchStep::Cancelled => continue,
            };

            state.page_count += 1;
            let page = ArchivedPage {
                sequence: state.page_count,
                url: state.current_url.clone(),
                identifier: derive_identifier(&content),
                content,
            };
            let location = self.archiver.store(&page)?;
            tracing::info!(
                "Saved page {} ({}) to {}",
                page.sequence,
                page.url,
                location.display()
            );
            pages.push(SavedPage { page, location });

            if state.reached_end {
                return Ok(CrawlOutcome::Completed);
            }

            let Some(next_url) = forward_links.into_iter().next() else {
                return Err(ChainError::ChainBroken {
                    url: state.current_url,
                });
            };

            if !state.visited.insert(page_key(&next_url)) {
                return Err(ChainError::ChainCycle {
                    from: state.current_url,
                    to: next_url,
                });
            }

            if self.settings.max_pages > 0 && state.page_count >= self.settings.max_pages {
                return Err(ChainError::PageLimit {
                    limit: self.settings.max_pages,
                });
            }

            if same_page(&next_url, target.end_url()) {
                tracing::info!("Next page is the end page: {}", next_url);
                state.reached_end = true;
            }

            state.current_url = next_url;
        }
    }

    /// Fetches one URL, retrying failures and empty extractions
    async fn fetch_with_retry(&mut self, url: &str) -> Result<FetchStep, ChainError> {
        let max_attempts = self.settings.pacing.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.fetcher.fetch(url, &self.settings.rules).await {
                Ok(PageExtraction {
                    text_blocks,
                    forward_links,
                }) => match text_blocks.into_iter().next() {
                    Some(content) => {
                        return Ok(FetchStep::Fetched {
                            content,
                            forward_links,
                        })
                    }
                    None => FetchError::EmptyContent,
                },
                Err(e) => e,
            };

            if attempt >= max_attempts {
                return Err(ChainError::FetchExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last_error: error,
                });
            }

            self.retries += 1;
            let backoff = self.settings.pacing.backoff(attempt);
            tracing::warn!(
                "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                attempt,
                max_attempts,
                url,
                error,
                backoff
            );

            if !wait(backoff, &self.cancel).await {
                return Ok(FetchStep::Cancelled);
            }
        }
    }
}

/// Whether two URLs name the same page
///
/// Parsed URLs are compared without their fragment; strings that do not parse
/// as URLs are compared exactly.
pub fn same_page(a: &str, b: &str) -> bool {
    page_key(a) == page_key(b)
}

fn page_key(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.trim().to_string(),
    }
}
