//! Robots.txt handling module
//!
//! Before a crawl starts, the start URL's host is asked for its robots.txt.
//! A disallow is either logged and ignored or turned into an error, depending
//! on the configured `RobotsPolicy`.

mod parser;

pub use parser::ParsedRobots;

use crate::config::RobotsPolicy;
use crate::{ChainError, Result};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// What robots.txt says about the start URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyVerdict {
    /// Crawling is allowed
    Allowed { crawl_delay: Option<Duration> },
    /// Crawling is disallowed, but the policy lets the crawl proceed
    Disallowed { crawl_delay: Option<Duration> },
}

impl PolicyVerdict {
    pub fn crawl_delay(&self) -> Option<Duration> {
        match self {
            Self::Allowed { crawl_delay } | Self::Disallowed { crawl_delay } => *crawl_delay,
        }
    }
}

/// Location of the robots.txt governing `page_url`
///
/// # Example
///
/// ```
/// use chapter_chain::robots::robots_url;
///
/// let url = robots_url("https://example.com:8443/serial/ch-1?x=1").unwrap();
/// assert_eq!(url.as_str(), "https://example.com:8443/robots.txt");
/// ```
pub fn robots_url(page_url: &str) -> Result<Url> {
    let url = Url::parse(page_url)?;
    Ok(url.join("/robots.txt")?)
}

/// Fetches robots.txt for the host of `page_url`
///
/// A missing file (4xx) allows everything, as does a robots.txt that cannot
/// be fetched at all; the latter is logged as a warning.
pub async fn fetch_robots(client: &Client, page_url: &str) -> Result<ParsedRobots> {
    let url = robots_url(page_url)?;

    match client.get(url.clone()).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => Ok(ParsedRobots::from_content(&body)),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", url, e);
                Ok(ParsedRobots::allow_all())
            }
        },
        Ok(response) if response.status().is_client_error() => {
            tracing::debug!("No robots.txt at {} ({})", url, response.status());
            Ok(ParsedRobots::allow_all())
        }
        Ok(response) => {
            tracing::warn!("Failed to read {}: HTTP {}", url, response.status());
            Ok(ParsedRobots::allow_all())
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", url, e);
            Ok(ParsedRobots::allow_all())
        }
    }
}

/// Consults the start URL's robots.txt before crawling
///
/// # Arguments
///
/// * `client` - The HTTP client
/// * `start_url` - First page of the crawl
/// * `user_agent` - The user agent the crawl will send
/// * `policy` - Whether a disallow only warns or stops the crawl
///
/// # Returns
///
/// * `Ok(PolicyVerdict)` - The crawl may proceed
/// * `Err(ChainError::RobotsDenied)` - Disallowed under `RobotsPolicy::Enforce`
pub async fn check_crawl_policy(
    client: &Client,
    start_url: &str,
    user_agent: &str,
    policy: RobotsPolicy,
) -> Result<PolicyVerdict> {
    let robots = fetch_robots(client, start_url).await?;
    let crawl_delay = robots.crawl_delay(user_agent);

    if robots.is_allowed(start_url, user_agent) {
        return Ok(PolicyVerdict::Allowed { crawl_delay });
    }

    match policy {
        RobotsPolicy::Enforce => Err(ChainError::RobotsDenied {
            url: start_url.to_string(),
        }),
        RobotsPolicy::Warn => {
            tracing::warn!(
                "robots.txt disallows {} for this user agent; crawling anyway",
                start_url
            );
            Ok(PolicyVerdict::Disallowed { crawl_delay })
        }
    }
}
