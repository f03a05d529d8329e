//! Book output
//!
//! This module binds the page archive into an EPUB file.

mod assembler;

pub use assembler::{
    escape_xml, AssembledBook, BookMetadata, Chapter, EpubAssembler, UNTITLED,
};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while assembling a book
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Pages directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("No pages found in {0}")]
    NoPages(PathBuf),

    #[error("Failed to read page {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to build EPUB: {0}")]
    Build(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for book assembly
pub type EpubResult<T> = Result<T, EpubError>;
