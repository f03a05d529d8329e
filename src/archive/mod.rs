//! Page archive
//!
//! This module persists each crawled page's text, including:
//! - Deriving file-safe identifiers from a page's first line
//! - The `PageArchiver` trait the crawler writes through
//! - A directory-backed archiver with atomic writes

mod directory;
mod identifier;
mod traits;

pub use directory::{list_page_files, DirectoryArchiver};
pub use identifier::{
    derive_identifier, page_file_name, sanitize_file_stem, DEFAULT_IDENTIFIER, MAX_IDENTIFIER_BYTES,
    MAX_IDENTIFIER_LEN,
};
pub use traits::{ArchiveError, ArchiveResult, ArchivedPage, PageArchiver, SavedPage};
