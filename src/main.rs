//! Chapter-Chain main entry point
//!
//! This is the command-line interface for the Chapter-Chain serial binder.

use anyhow::{bail, Context};
use chapter_chain::config::{load_config_with_hash, validate_page_url, Config};
use chapter_chain::crawler::{crawl, CrawlTarget};
use chapter_chain::epub::{BookMetadata, EpubAssembler};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Chapter-Chain: bind a web serial into an EPUB
///
/// Chapter-Chain follows "next chapter" links from a start URL to an end URL,
/// saves each chapter's text, and packages the chapters into one EPUB book.
#[derive(Parser, Debug)]
#[command(name = "chapter-chain")]
#[command(version)]
#[command(about = "Bind a web serial into an EPUB", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// First chapter URL (overrides crawl.start-url)
    #[arg(long)]
    start_url: Option<String>,

    /// Last chapter URL (overrides crawl.end-url)
    #[arg(long)]
    end_url: Option<String>,

    /// Book title (overrides book.title)
    #[arg(long)]
    title: Option<String>,

    /// Book author (overrides book.author)
    #[arg(long)]
    author: Option<String>,

    /// Book language code (overrides book.language)
    #[arg(long)]
    language: Option<String>,

    /// Directory for archived pages (overrides output.pages-dir)
    #[arg(long)]
    pages_dir: Option<String>,

    /// Directory for the finished EPUB (overrides output.epub-dir)
    #[arg(long)]
    epub_dir: Option<String>,

    /// Remove pages left in the pages directory by an earlier crawl
    #[arg(long)]
    fresh: bool,

    /// Bind whatever was saved even if the crawl stopped early
    #[arg(long)]
    allow_partial: bool,

    /// Only crawl; do not build the EPUB
    #[arg(long, conflicts_with = "bind_only")]
    no_epub: bool,

    /// Skip crawling and build the EPUB from an existing pages directory
    #[arg(long)]
    bind_only: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["no_epub", "bind_only"])]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };
    apply_overrides(&mut config, &cli)?;

    if cli.bind_only {
        return bind(&config);
    }

    let target = resolve_target(&config)?;

    if cli.dry_run {
        handle_dry_run(&config, &target);
        return Ok(());
    }

    handle_crawl(&config, &target, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("chapter_chain=info,warn"),
            1 => EnvFilter::new("chapter_chain=debug,info"),
            2 => EnvFilter::new("chapter_chain=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    for (name, value) in [("start-url", &cli.start_url), ("end-url", &cli.end_url)] {
        if let Some(value) = value {
            validate_page_url(name, value)?;
        }
    }

    if let Some(url) = &cli.start_url {
        config.crawl.start_url = Some(url.clone());
    }
    if let Some(url) = &cli.end_url {
        config.crawl.end_url = Some(url.clone());
    }
    if let Some(title) = &cli.title {
        config.book.title = Some(title.clone());
    }
    if let Some(author) = &cli.author {
        config.book.author = author.clone();
    }
    if let Some(language) = cli.language.as_deref().filter(|l| !l.trim().is_empty()) {
        config.book.language = language.trim().to_string();
    }
    if let Some(dir) = &cli.pages_dir {
        config.output.pages_dir = dir.clone();
    }
    if let Some(dir) = &cli.epub_dir {
        config.output.epub_dir = dir.clone();
    }

    Ok(())
}

fn resolve_target(config: &Config) -> anyhow::Result<CrawlTarget> {
    let start = config.crawl.start_url.as_deref().unwrap_or_default();
    let end = config.crawl.end_url.as_deref().unwrap_or_default();

    if start.trim().is_empty() || end.trim().is_empty() {
        bail!("Start URL or end URL not provided (use --start-url/--end-url or the [crawl] section)");
    }

    Ok(CrawlTarget::new(start, end)?)
}

/// Handles the --dry-run mode: shows the effective settings
fn handle_dry_run(config: &Config, target: &CrawlTarget) {
    println!("=== Chapter-Chain Dry Run ===\n");

    println!("Crawl:");
    println!("  Start URL: {}", target.start_url());
    println!("  End URL: {}", target.end_url());
    println!("  Content selector: {}", config.crawl.content_selector);
    println!("  Next selector: {}", config.crawl.next_selector);
    println!("  Max retries per page: {}", config.crawl.max_retries);
    println!(
        "  Delay between pages: {}-{}ms",
        config.crawl.min_delay_ms, config.crawl.max_delay_ms
    );
    println!("  Robots policy: {:?}", config.crawl.robots_policy);

    println!("\nBook:");
    println!(
        "  Title: {}",
        config.book.title.as_deref().unwrap_or("(first line of first chapter)")
    );
    println!("  Author: {}", config.book.author);
    println!("  Language: {}", config.book.language);

    println!("\nOutput:");
    println!("  Pages: {}", config.output.pages_dir);
    println!("  EPUB directory: {}", config.output.epub_dir);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl, then binds the book
async fn handle_crawl(config: &Config, target: &CrawlTarget, cli: &Cli) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            on_signal.cancel();
        }
    });

    let complete = match crawl(config, target, cli.fresh, cancel).await {
        Ok(report) => {
            let elapsed = report.finished_at - report.started_at;
            println!(
                "Saved {} pages to {} in {}s ({} retries)",
                report.pages.len(),
                config.output.pages_dir,
                elapsed.num_seconds(),
                report.retries
            );
            if !report.is_complete() {
                println!(
                    "Crawl stopped before the end URL; {} pages saved",
                    report.pages.len()
                );
            }
            report.is_complete()
        }
        Err(abort) => {
            tracing::error!("Crawl failed: {}", abort.error);
            println!("{} pages saved before failure in {}", abort.pages.len(), config.output.pages_dir);
            if abort.pages.is_empty() || !cli.allow_partial {
                return Err(abort.into());
            }
            false
        }
    };

    if cli.no_epub {
        return Ok(());
    }
    if !complete && !cli.allow_partial {
        println!("Use --allow-partial (or --bind-only later) to build a book from the saved pages");
        return Ok(());
    }

    bind(config)
}

/// Builds the EPUB from the pages directory
fn bind(config: &Config) -> anyhow::Result<()> {
    let assembler = EpubAssembler::new(BookMetadata::from(&config.book));
    let book = assembler
        .assemble(
            Path::new(&config.output.pages_dir),
            Path::new(&config.output.epub_dir),
        )
        .context("Failed to build EPUB")?;

    println!(
        "✓ \"{}\" created with {} chapters: {}",
        book.title,
        book.chapters,
        book.path.display()
    );
    Ok(())
}
