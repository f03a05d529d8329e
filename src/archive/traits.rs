//! Archiver traits and error types
//!
//! This module defines the trait interface for page archivers and the
//! records that flow through it.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while archiving pages
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Archive directory {0} already holds pages (use a fresh archive to overwrite)")]
    NotEmpty(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// One page's text, ready to be archived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedPage {
    /// 1-based fetch order
    pub sequence: u32,

    /// URL the text was extracted from
    pub url: String,

    /// File-safe name derived from the first line of `content`
    pub identifier: String,

    /// The extracted text
    pub content: String,
}

/// A page together with the location the archiver stored it at
#[derive(Debug, Clone)]
pub struct SavedPage {
    pub page: ArchivedPage,
    pub location: PathBuf,
}

/// Trait for durable page storage
///
/// The crawler hands pages over strictly in fetch order. A failed `store`
/// aborts the crawl, so implementations must not report success for a page
/// that is not fully written.
pub trait PageArchiver {
    /// Stores one page and returns where it was written
    fn store(&mut self, page: &ArchivedPage) -> ArchiveResult<PathBuf>;
}
