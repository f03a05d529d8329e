//! EPUB generation from an archive directory
//!
//! Archived pages are read in file-name order (which the archive's sequence
//! prefix makes equal to fetch order) and each becomes one chapter.

use crate::archive::{list_page_files, sanitize_file_stem};
use crate::config::BookConfig;
use crate::epub::{EpubError, EpubResult};
use epub_builder::{EpubBuilder, EpubContent, ReferenceType, ZipLibrary};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Book title used when neither the configuration nor the first page gives one
pub const UNTITLED: &str = "Untitled";

/// Title, author and language written into the book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    /// Explicit title; when `None` the first line of the first chapter is used
    pub title: Option<String>,
    pub author: String,
    pub language: String,
}

impl From<&BookConfig> for BookMetadata {
    fn from(config: &BookConfig) -> Self {
        Self {
            title: config
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            author: config.author.clone(),
            language: config.language.clone(),
        }
    }
}

/// One chapter read back from the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// First line of the page, or the file stem for a blank first line
    pub title: String,
    /// Remaining non-blank lines
    pub paragraphs: Vec<String>,
}

impl Chapter {
    /// Splits archived page text into a heading and paragraphs
    pub fn from_text(text: &str, fallback_title: &str) -> Self {
        let mut lines = text.lines();
        let title = lines
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .unwrap_or(fallback_title)
            .to_string();
        let paragraphs = lines
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Self { title, paragraphs }
    }

    /// Renders the chapter as a standalone XHTML document
    pub fn to_xhtml(&self, language: &str) -> String {
        let mut body = format!("<h1>{}</h1>\n", escape_xml(&self.title));
        for paragraph in &self.paragraphs {
            body.push_str(&format!("<p>{}</p>\n", escape_xml(paragraph)));
        }

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE html>\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"{lang}\" lang=\"{lang}\">\n\
             <head><title>{title}</title></head>\n\
             <body>\n{body}</body>\n\
             </html>\n",
            lang = escape_xml(language),
            title = escape_xml(&self.title),
            body = body
        )
    }
}

/// A finished book on disk
#[derive(Debug, Clone)]
pub struct AssembledBook {
    pub path: PathBuf,
    pub title: String,
    pub chapters: usize,
}

/// Binds archived pages into an EPUB
#[derive(Debug, Clone)]
pub struct EpubAssembler {
    metadata: BookMetadata,
}

impl EpubAssembler {
    pub fn new(metadata: BookMetadata) -> Self {
        Self { metadata }
    }

    /// Reads every archived page in `pages_dir` as a chapter, in order
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Chapter>)` - At least one chapter
    /// * `Err(EpubError::NoPages)` - The directory holds no pages
    pub fn load_chapters(pages_dir: &Path) -> EpubResult<Vec<Chapter>> {
        if !pages_dir.is_dir() {
            return Err(EpubError::MissingDirectory(pages_dir.to_path_buf()));
        }

        let files = list_page_files(pages_dir)?;
        if files.is_empty() {
            return Err(EpubError::NoPages(pages_dir.to_path_buf()));
        }

        files
            .iter()
            .map(|path| {
                let text = fs::read_to_string(path).map_err(|source| EpubError::Read {
                    path: path.clone(),
                    source,
                })?;
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(Chapter::from_text(&text, &stem))
            })
            .collect()
    }

    /// The title the book will carry
    pub fn resolve_title(&self, chapters: &[Chapter]) -> String {
        self.metadata
            .title
            .clone()
            .or_else(|| chapters.first().map(|c| c.title.clone()))
            .unwrap_or_else(|| UNTITLED.to_string())
    }

    /// Builds `<epub_dir>/<title>.epub` from the pages in `pages_dir`
    ///
    /// # Arguments
    ///
    /// * `pages_dir` - Directory of archived pages
    /// * `epub_dir` - Output directory, created if missing
    ///
    /// # Returns
    ///
    /// * `Ok(AssembledBook)` - Where the book was written and what it holds
    /// * `Err(EpubError)` - No pages, unreadable pages, or a write failure
    pub fn assemble(&self, pages_dir: &Path, epub_dir: &Path) -> EpubResult<AssembledBook> {
        let chapters = Self::load_chapters(pages_dir)?;
        let title = self.resolve_title(&chapters);

        let mut builder = EpubBuilder::new(ZipLibrary::new().map_err(build_error)?)
            .map_err(build_error)?;
        builder
            .metadata("title", title.as_str())
            .map_err(build_error)?;
        builder
            .metadata("author", self.metadata.author.as_str())
            .map_err(build_error)?;
        builder
            .metadata("lang", self.metadata.language.as_str())
            .map_err(build_error)?;
        builder.inline_toc();

        for (i, chapter) in chapters.iter().enumerate() {
            let xhtml = chapter.to_xhtml(&self.metadata.language);
            builder
                .add_content(
                    EpubContent::new(format!("chap_{:03}.xhtml", i + 1), xhtml.as_bytes())
                        .title(chapter.title.as_str())
                        .reftype(ReferenceType::Text),
                )
                .map_err(build_error)?;
            tracing::debug!("Added chapter {}: {}", i + 1, chapter.title);
        }

        fs::create_dir_all(epub_dir)?;
        let path = epub_dir.join(format!("{}.epub", sanitize_file_stem(&title, "book")));

        let mut tmp = NamedTempFile::new_in(epub_dir)?;
        builder.generate(tmp.as_file_mut()).map_err(build_error)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| EpubError::Io(e.error))?;

        tracing::info!(
            "EPUB created with {} chapters: {}",
            chapters.len(),
            path.display()
        );

        Ok(AssembledBook {
            path,
            title,
            chapters: chapters.len(),
        })
    }
}

fn build_error(error: impl Display) -> EpubError {
    EpubError::Build(error.to_string())
}

/// Escapes text for use in XHTML content and attribute values
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn metadata(title: Option<&str>) -> BookMetadata {
        BookMetadata {
            title: title.map(str::to_string),
            author: "Tester".to_string(),
            language: "en".to_string(),
        }
    }

    fn write_pages(dir: &Path, pages: &[(&str, &str)]) {
        for (name, text) in pages {
            fs::write(dir.join(name), text).unwrap();
        }
    }

    #[test]
    fn test_chapter_from_text() {
        let chapter = Chapter::from_text("Chapter 1\n\nFirst line.\n  Second line.  \n", "0001_x");
        assert_eq!(chapter.title, "Chapter 1");
        assert_eq!(chapter.paragraphs, vec!["First line.", "Second line."]);
    }

    #[test]
    fn test_chapter_blank_heading_uses_fallback() {
        let chapter = Chapter::from_text("   \nBody", "0003_scraped_content");
        assert_eq!(chapter.title, "0003_scraped_content");
        assert_eq!(chapter.paragraphs, vec!["Body"]);
    }

    #[test]
    fn test_to_xhtml_escapes_text() {
        let chapter = Chapter {
            title: "Tom & Jerry".to_string(),
            paragraphs: vec!["1 < 2 > 0".to_string()],
        };
        let xhtml = chapter.to_xhtml("en");
        assert!(xhtml.contains("<h1>Tom &amp; Jerry</h1>"));
        assert!(xhtml.contains("<p>1 &lt; 2 &gt; 0</p>"));
        assert!(xhtml.contains("xml:lang=\"en\""));
    }

    #[test]
    fn test_load_chapters_in_sequence_order() {
        let dir = TempDir::new().unwrap();
        write_pages(
            dir.path(),
            &[
                ("0002_Beta.txt", "Beta\nsecond"),
                ("0010_Kappa.txt", "Kappa\ntenth"),
                ("0001_Zulu.txt", "Zulu\nfirst"),
                ("notes.md", "ignored"),
            ],
        );

        let chapters = EpubAssembler::load_chapters(dir.path()).unwrap();
        let titles: Vec<_> = chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Zulu", "Beta", "Kappa"]);
    }

    #[test]
    fn test_load_chapters_empty_dir() {
        let dir = TempDir::new().unwrap();
        let result = EpubAssembler::load_chapters(dir.path());
        assert!(matches!(result, Err(EpubError::NoPages(_))));
    }

    #[test]
    fn test_load_chapters_missing_dir() {
        let dir = TempDir::new().unwrap();
        let result = EpubAssembler::load_chapters(&dir.path().join("nope"));
        assert!(matches!(result, Err(EpubError::MissingDirectory(_))));
    }

    #[test]
    fn test_resolve_title() {
        let chapters = vec![Chapter::from_text("Prologue\ntext", "x")];

        let explicit = EpubAssembler::new(metadata(Some("My Serial")));
        assert_eq!(explicit.resolve_title(&chapters), "My Serial");

        let derived = EpubAssembler::new(metadata(None));
        assert_eq!(derived.resolve_title(&chapters), "Prologue");
        assert_eq!(derived.resolve_title(&[]), UNTITLED);
    }

    #[test]
    fn test_metadata_from_config_ignores_blank_title() {
        let config = BookConfig {
            title: Some("   ".to_string()),
            ..BookConfig::default()
        };
        let metadata = BookMetadata::from(&config);
        assert_eq!(metadata.title, None);
        assert_eq!(metadata.author, "Unknown");
    }

    #[test]
    fn test_assemble_writes_epub() {
        let pages = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_pages(
            pages.path(),
            &[
                ("0001_Chapter_1.txt", "Chapter 1\nIt begins."),
                ("0002_Chapter_2.txt", "Chapter 2\nIt ends."),
            ],
        );
        let epub_dir = out.path().join("epubs");

        let book = EpubAssembler::new(metadata(Some("Serial: Part 1")))
            .assemble(pages.path(), &epub_dir)
            .unwrap();

        assert_eq!(book.chapters, 2);
        assert_eq!(book.title, "Serial: Part 1");
        assert_eq!(book.path, epub_dir.join("Serial_Part_1.epub"));

        let bytes = fs::read(&book.path).unwrap();
        assert!(bytes.starts_with(b"PK"));
        assert_eq!(fs::read_dir(&epub_dir).unwrap().count(), 1);
    }
}
