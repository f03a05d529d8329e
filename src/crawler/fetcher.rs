//! Page fetching
//!
//! This module defines the `PageFetcher` capability the crawl loop depends
//! on and its HTTP implementation, including:
//! - Building HTTP clients with the configured user agent and headers
//! - GET requests for chapter pages
//! - Error classification for the retry logic

use crate::config::HttpConfig;
use crate::crawler::parser::extract_page;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors from a single fetch attempt
///
/// The crawl loop treats every variant as transient and retries the same URL
/// until its retry bound is exhausted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("No content matched the content selector")]
    EmptyContent,
}

/// CSS selectors used to pull chapter text and the next link out of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRules {
    pub content_selector: String,
    pub next_selector: String,
}

impl ExtractionRules {
    pub fn new(content_selector: impl Into<String>, next_selector: impl Into<String>) -> Self {
        Self {
            content_selector: content_selector.into(),
            next_selector: next_selector.into(),
        }
    }
}

/// Fields extracted from one fetched page
///
/// Both lists may be empty; that is a valid result, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtraction {
    /// Rendered text of each element matching the content selector
    pub text_blocks: Vec<String>,

    /// Absolute URLs of each element matching the next-link selector
    pub forward_links: Vec<String>,
}

/// Capability to load a page and extract its content and forward links
pub trait PageFetcher {
    /// Fetches `url` and applies `rules` to the loaded document
    fn fetch(
        &self,
        url: &str,
        rules: &ExtractionRules,
    ) -> impl Future<Output = Result<PageExtraction, FetchError>> + Send;
}

/// Builds an HTTP client from the HTTP configuration
///
/// # Arguments
///
/// * `config` - User agent, language and timeout settings
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    if let Ok(language) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages over HTTP and extracts them from the static HTML
///
/// Content rendered client-side by JavaScript is not visible to this fetcher.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Sends the GET request and returns the final URL and body
    async fn load(&self, url: &str) -> Result<(Url, String), FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(classify_error)?;
        Ok((final_url, body))
    }
}

impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, rules: &ExtractionRules) -> Result<PageExtraction, FetchError> {
        Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        tracing::info!("Loading page: {}", url);
        let (final_url, body) = self.load(url).await?;
        if final_url.as_str() != url {
            tracing::debug!("{} redirected to {}", url, final_url);
        }

        let extraction = extract_page(&body, &final_url, rules)?;
        tracing::debug!(
            "Extracted {} text blocks and {} forward links from {}",
            extraction.text_blocks.len(),
            extraction.forward_links.len(),
            final_url
        );
        Ok(extraction)
    }
}

/// Maps a reqwest error onto the fetch error kinds
fn classify_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_connect() {
        FetchError::Network(format!("Connection failed: {}", error))
    } else {
        FetchError::Network(error.to_string())
    }
}
