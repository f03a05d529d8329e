//! Chapter-Chain: a web serial to EPUB binder
//!
//! This crate follows the "next chapter" links of a web serial from a start
//! URL to an end URL, archives each chapter's text to disk in fetch order and
//! binds the archive into a single EPUB book.

pub mod archive;
pub mod config;
pub mod crawler;
pub mod epub;
pub mod robots;

use thiserror::Error;

/// Main error type for Chapter-Chain operations
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid crawl target: {0}")]
    InvalidTarget(String),

    #[error("Gave up on {url} after {attempts} attempts: {last_error}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        last_error: crawler::FetchError,
    },

    #[error("No forward link found on {url}")]
    ChainBroken { url: String },

    #[error("Forward link from {from} leads back to already visited {to}")]
    ChainCycle { from: String, to: String },

    #[error("Page limit of {limit} reached before the end URL")]
    PageLimit { limit: u32 },

    #[error("Archive error: {0}")]
    Archive(#[from] archive::ArchiveError),

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDenied { url: String },

    #[error("EPUB error: {0}")]
    Epub(#[from] epub::EpubError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Chapter-Chain operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use archive::{ArchivedPage, DirectoryArchiver, PageArchiver, SavedPage};
pub use config::Config;
pub use crawler::{CrawlAbort, CrawlReport, CrawlTarget, PageChainCrawler};
