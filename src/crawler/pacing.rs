//! Request pacing for the crawl loop
//!
//! This module handles:
//! - The random politeness delay between page fetches
//! - Exponential backoff between retries of the same URL
//! - Cancellable waiting, so a stop request never sits out a long sleep

use crate::config::CrawlConfig;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Timing knobs for the crawl loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    /// Retries allowed per URL after the first failed attempt
    pub max_retries: u32,

    /// Backoff before the first retry, doubled per further retry
    pub retry_backoff: Duration,

    /// Cap on a single backoff wait
    pub max_backoff: Duration,

    /// Lower bound of the delay between page fetches
    pub min_delay: Duration,

    /// Upper bound of the delay between page fetches
    pub max_delay: Duration,

    /// Ceiling applied to a site's robots.txt `Crawl-delay`
    pub max_crawl_delay: Duration,
}

impl Pacing {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_crawl_delay: Duration::from_millis(config.max_crawl_delay_ms),
        }
    }

    /// No waiting at all; retries still bounded by `max_retries`
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            retry_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_crawl_delay: Duration::ZERO,
        }
    }

    /// Raises the delay floor to a site's robots.txt `Crawl-delay`, clamped
    /// to `max_crawl_delay`
    pub fn with_crawl_delay(mut self, crawl_delay: Duration) -> Self {
        let crawl_delay = if crawl_delay > self.max_crawl_delay {
            tracing::warn!(
                "robots.txt crawl delay of {:?} exceeds the {:?} ceiling; using the ceiling",
                crawl_delay,
                self.max_crawl_delay
            );
            self.max_crawl_delay
        } else {
            crawl_delay
        };

        if crawl_delay > self.min_delay {
            self.min_delay = crawl_delay;
            self.max_delay = self.max_delay.max(crawl_delay);
        }
        self
    }

    /// Total fetch attempts allowed for one URL
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Random delay before the next page fetch, within `[min_delay, max_delay]`
    pub fn politeness_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let millis = rand::thread_rng()
            .gen_range(self.min_delay.as_millis() as u64..=self.max_delay.as_millis() as u64);
        Duration::from_millis(millis)
    }

    /// Backoff before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.retry_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Sleeps for `duration` unless `cancel` fires first
///
/// Returns `false` when the wait was cut short by cancellation.
pub async fn wait(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }

    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
