//! File-safe identifiers derived from page text

/// Identifier used when the first line sanitizes to nothing
pub const DEFAULT_IDENTIFIER: &str = "scraped_content";

/// Maximum identifier length in characters
pub const MAX_IDENTIFIER_LEN: usize = 100;

/// Maximum identifier length in UTF-8 bytes; file systems cap names at 255
/// bytes and the sequence prefix and extension need the rest
pub const MAX_IDENTIFIER_BYTES: usize = 200;

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Derives an identifier from the first line of a page's text
///
/// The first line is trimmed, stripped of characters that are illegal in
/// file names, cut to [`MAX_IDENTIFIER_LEN`] characters (and at most
/// [`MAX_IDENTIFIER_BYTES`] bytes) and has its whitespace replaced with `_`. Leading and trailing dots are removed so the
/// result never names a hidden or relative path. An empty result falls back
/// to [`DEFAULT_IDENTIFIER`].
///
/// # Example
///
/// ```
/// use chapter_chain::archive::derive_identifier;
///
/// assert_eq!(derive_identifier("Chapter 3: The Door\nIt was..."), "Chapter_3_The_Door");
/// assert_eq!(derive_identifier("???"), "scraped_content");
/// ```
pub fn derive_identifier(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or("");
    sanitize_file_stem(first_line, DEFAULT_IDENTIFIER)
}

/// Turns arbitrary text into a file-name stem, or `fallback` when nothing
/// usable is left
pub fn sanitize_file_stem(text: &str, fallback: &str) -> String {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .take(MAX_IDENTIFIER_LEN)
        .collect();

    let replaced: String = cleaned
        .trim()
        .trim_matches('.')
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let identifier = truncate_bytes(&replaced, MAX_IDENTIFIER_BYTES).trim_end_matches('.');

    if identifier.is_empty() {
        fallback.to_string()
    } else {
        identifier.to_string()
    }
}

/// Longest prefix of `text` that fits in `max_bytes` without splitting a char
fn truncate_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// File name for an archived page: a zero-padded sequence prefix keeps
/// lexical order equal to fetch order
pub fn page_file_name(sequence: u32, identifier: &str) -> String {
    format!("{:04}_{}.txt", sequence, identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uses_first_line_only() {
        let content = "Capitolo 1 - L'inizio\nSecond line\nThird line";
        assert_eq!(derive_identifier(content), "Capitolo_1_-_L'inizio");
    }

    #[test]
    fn test_strips_illegal_characters() {
        assert_eq!(
            derive_identifier("What? <Really>: \"yes\" / no | maybe*"),
            "What_Really_yes__no__maybe"
        );
    }

    #[test]
    fn test_truncates_long_lines() {
        let content = "a".repeat(250);
        assert_eq!(derive_identifier(&content).chars().count(), MAX_IDENTIFIER_LEN);
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let content = "é".repeat(150);
        let identifier = derive_identifier(&content);
        assert_eq!(identifier.chars().count(), MAX_IDENTIFIER_LEN);
    }

    #[test]
    fn test_truncation_caps_bytes_for_wide_characters() {
        let identifier = derive_identifier(&"第一章".repeat(40));
        assert!(identifier.len() <= MAX_IDENTIFIER_BYTES);
        assert_eq!(identifier, "第一章".repeat(40)[..198]);

        let emoji = derive_identifier(&"📖".repeat(100));
        assert_eq!(emoji.len(), MAX_IDENTIFIER_BYTES);
    }

    #[test]
    fn test_fallback_for_punctuation_only() {
        assert_eq!(derive_identifier("?*?|"), DEFAULT_IDENTIFIER);
        assert_eq!(derive_identifier("..."), DEFAULT_IDENTIFIER);
        assert_eq!(derive_identifier(""), DEFAULT_IDENTIFIER);
        assert_eq!(derive_identifier("   \nbody"), DEFAULT_IDENTIFIER);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let content = "Chapter 12: Into the Dark\nbody text";
        assert_eq!(derive_identifier(content), derive_identifier(content));
    }

    #[test]
    fn test_sanitize_file_stem_fallback() {
        assert_eq!(sanitize_file_stem("My Book: Vol. 1", "book"), "My_Book_Vol._1");
        assert_eq!(sanitize_file_stem(" / ", "book"), "book");
    }

    #[test]
    fn test_page_file_name_sorts_by_sequence() {
        let mut names = vec![
            page_file_name(10, "Zeta"),
            page_file_name(2, "Beta"),
            page_file_name(1, "Omega"),
        ];
        names.sort();
        assert_eq!(
            names,
            vec!["0001_Omega.txt", "0002_Beta.txt", "0010_Zeta.txt"]
        );
    }
}
