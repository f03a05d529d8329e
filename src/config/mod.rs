//! Configuration module for Chapter-Chain
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use chapter_chain::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("book.toml")).unwrap();
//! println!("Content selector: {}", config.crawl.content_selector);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{BookConfig, Config, CrawlConfig, HttpConfig, OutputConfig, RobotsPolicy};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate_page_url;
