//! Directory-backed page archive
//!
//! Each page becomes one UTF-8 text file named `NNNN_identifier.txt`. Files
//! are written to a temporary file inside the archive directory and renamed
//! into place, so a crash mid-write never leaves a truncated page under a
//! final name.

use crate::archive::identifier::page_file_name;
use crate::archive::traits::{ArchiveError, ArchiveResult, ArchivedPage, PageArchiver};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Archiver writing one text file per page into a directory
#[derive(Debug)]
pub struct DirectoryArchiver {
    dir: PathBuf,
}

impl DirectoryArchiver {
    /// Opens (creating if needed) an archive directory
    ///
    /// # Arguments
    ///
    /// * `dir` - The archive directory
    /// * `fresh` - Remove page files left by a previous crawl
    ///
    /// # Returns
    ///
    /// * `Ok(DirectoryArchiver)` - The directory is ready for a new crawl
    /// * `Err(ArchiveError::NotEmpty)` - Old pages exist and `fresh` is false;
    ///   mixing them with a new crawl would corrupt chapter order
    pub fn open(dir: &Path, fresh: bool) -> ArchiveResult<Self> {
        if dir.exists() && !dir.is_dir() {
            return Err(ArchiveError::NotADirectory(dir.to_path_buf()));
        }
        fs::create_dir_all(dir)?;

        let existing = list_page_files(dir)?;
        if !existing.is_empty() {
            if !fresh {
                return Err(ArchiveError::NotEmpty(dir.to_path_buf()));
            }
            tracing::info!(
                "Removing {} pages from previous crawl in {}",
                existing.len(),
                dir.display()
            );
            for path in existing {
                fs::remove_file(path)?;
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// The archive directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PageArchiver for DirectoryArchiver {
    fn store(&mut self, page: &ArchivedPage) -> ArchiveResult<PathBuf> {
        let path = self
            .dir
            .join(page_file_name(page.sequence, &page.identifier));

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(page.content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| ArchiveError::Persist {
            path: path.clone(),
            source: e.error,
        })?;

        tracing::debug!("Wrote {} bytes to {}", page.content.len(), path.display());
        Ok(path)
    }
}

/// Lists archived page files (`*.txt`) in a directory, sorted by name
pub fn list_page_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::derive_identifier;
    use tempfile::TempDir;

    fn page(sequence: u32, identifier: &str, content: &str) -> ArchivedPage {
        ArchivedPage {
            sequence,
            url: format!("https://example.com/{}", sequence),
            identifier: identifier.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_store_writes_named_file() {
        let dir = TempDir::new().unwrap();
        let mut archiver = DirectoryArchiver::open(dir.path(), false).unwrap();

        let path = archiver
            .store(&page(1, "Chapter_1", "Chapter 1\nOnce upon a time"))
            .unwrap();

        assert_eq!(path, dir.path().join("0001_Chapter_1.txt"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Chapter 1\nOnce upon a time"
        );
    }

    #[test]
    fn test_store_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let mut archiver = DirectoryArchiver::open(dir.path(), false).unwrap();
        archiver.store(&page(1, "One", "one")).unwrap();
        archiver.store(&page(2, "Two", "two")).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_same_identifier_does_not_collide() {
        let dir = TempDir::new().unwrap();
        let mut archiver = DirectoryArchiver::open(dir.path(), false).unwrap();
        archiver.store(&page(1, "scraped_content", "first")).unwrap();
        archiver.store(&page(2, "scraped_content", "second")).unwrap();

        let files = list_page_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(fs::read_to_string(&files[0]).unwrap(), "first");
        assert_eq!(fs::read_to_string(&files[1]).unwrap(), "second");
    }

    #[test]
    fn test_store_long_multibyte_title() {
        let dir = TempDir::new().unwrap();
        let mut archiver = DirectoryArchiver::open(dir.path(), false).unwrap();
        let content = format!("{}\nbody", "第一章".repeat(40));
        let identifier = derive_identifier(&content);

        let path = archiver.store(&page(1, &identifier, &content)).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.len() <= 255);
        assert!(name.starts_with("0001_第一章"));
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("book").join("pages");
        let archiver = DirectoryArchiver::open(&nested, false).unwrap();
        assert!(nested.is_dir());
        assert_eq!(archiver.dir(), nested.as_path());
    }

    #[test]
    fn test_open_refuses_leftover_pages() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("0001_Old.txt"), "old").unwrap();

        let result = DirectoryArchiver::open(dir.path(), false);
        assert!(matches!(result, Err(ArchiveError::NotEmpty(_))));
    }

    #[test]
    fn test_fresh_open_clears_leftover_pages_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("0001_Old.txt"), "old").unwrap();
        fs::write(dir.path().join("notes.md"), "keep me").unwrap();

        DirectoryArchiver::open(dir.path(), true).unwrap();

        assert!(!dir.path().join("0001_Old.txt").exists());
        assert!(dir.path().join("notes.md").exists());
    }

    #[test]
    fn test_open_rejects_file_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("pages");
        fs::write(&file, "").unwrap();

        let result = DirectoryArchiver::open(&file, false);
        assert!(matches!(result, Err(ArchiveError::NotADirectory(_))));
    }
}
