use serde::Deserialize;

/// Main configuration structure for Chapter-Chain
///
/// Every section and field has a default, so an empty file (or no file at
/// all) yields a usable configuration once start and end URLs are supplied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub crawl: CrawlConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub book: BookConfig,
}

/// Crawl loop behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// First chapter of the serial
    pub start_url: Option<String>,

    /// Last chapter of the serial (fetched and archived, then the crawl stops)
    pub end_url: Option<String>,

    /// CSS selector for the chapter text block
    pub content_selector: String,

    /// CSS selector for the "next chapter" anchor
    pub next_selector: String,

    /// Retries allowed per URL after the first failed attempt
    pub max_retries: u32,

    /// Base backoff before the first retry (milliseconds), doubled per retry
    pub retry_backoff_ms: u64,

    /// Upper bound on a single backoff wait (milliseconds)
    pub max_backoff_ms: u64,

    /// Lower bound of the random delay between page fetches (milliseconds)
    pub min_delay_ms: u64,

    /// Upper bound of the random delay between page fetches (milliseconds)
    pub max_delay_ms: u64,

    /// Ceiling on a robots.txt `Crawl-delay` (milliseconds)
    pub max_crawl_delay_ms: u64,

    /// Maximum number of pages to archive; 0 means unlimited
    pub max_pages: u32,

    /// What to do when robots.txt disallows the start URL
    pub robots_policy: RobotsPolicy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_url: None,
            end_url: None,
            content_selector: "#dle-content > article > div.block.story.shortstory".to_string(),
            next_selector: "#next".to_string(),
            max_retries: 5,
            retry_backoff_ms: 2_000,
            max_backoff_ms: 30_000,
            min_delay_ms: 3_000,
            max_delay_ms: 6_000,
            max_crawl_delay_ms: 30_000,
            max_pages: 0,
            robots_policy: RobotsPolicy::Warn,
        }
    }
}

/// Handling of a robots.txt disallow for the start URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RobotsPolicy {
    /// Log a warning and crawl anyway (fail-open)
    #[default]
    Warn,
    /// Refuse to crawl (fail-closed)
    Enforce,
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept_language: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            accept_language: "it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            timeout_secs: 20,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory receiving one text file per archived page
    pub pages_dir: String,

    /// Directory receiving the finished EPUB
    pub epub_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pages_dir: "temp".to_string(),
            epub_dir: "epubs".to_string(),
        }
    }
}

/// Book metadata
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BookConfig {
    /// Book title; when unset the first line of the first chapter is used
    pub title: Option<String>,
    pub author: String,
    pub language: String,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            title: None,
            author: "Unknown".to_string(),
            language: "en".to_string(),
        }
    }
}
