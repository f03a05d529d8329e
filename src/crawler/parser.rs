//! HTML extraction of chapter text and forward links
//!
//! This module turns a fetched HTML document into a `PageExtraction`:
//! - The rendered text of every element matching the content selector
//! - The resolved `href` of every element matching the next-link selector

use crate::crawler::fetcher::{ExtractionRules, FetchError, PageExtraction};
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements after which rendered text breaks the line
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "div", "dd", "dl", "dt", "figcaption", "footer", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table",
    "tr", "ul",
];

/// Elements whose text is never rendered
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracts chapter text blocks and forward links from an HTML document
///
/// Text blocks that render to nothing are dropped, as are links that cannot
/// lead to another page (`javascript:`, `mailto:`, fragment-only, ...).
///
/// # Arguments
///
/// * `html` - The HTML content
/// * `base_url` - The page URL, used to resolve relative links
/// * `rules` - The content and next-link selectors
///
/// # Example
///
/// ```
/// use chapter_chain::crawler::{extract_page, ExtractionRules};
/// use url::Url;
///
/// let html = r#"<div class="story"><p>Chapter 1</p><p>Text</p></div><a id="next" href="/2">Next</a>"#;
/// let rules = ExtractionRules::new("div.story", "#next");
/// let base = Url::parse("https://example.com/1").unwrap();
///
/// let page = extract_page(html, &base, &rules).unwrap();
/// assert_eq!(page.text_blocks, vec!["Chapter 1\nText".to_string()]);
/// assert_eq!(page.forward_links, vec!["https://example.com/2".to_string()]);
/// ```
pub fn extract_page(
    html: &str,
    base_url: &Url,
    rules: &ExtractionRules,
) -> Result<PageExtraction, FetchError> {
    let content_selector = parse_selector(&rules.content_selector)?;
    let next_selector = parse_selector(&rules.next_selector)?;

    let document = Html::parse_document(html);

    let text_blocks = document
        .select(&content_selector)
        .map(|element| rendered_text(&element))
        .filter(|text| !text.is_empty())
        .collect();

    let forward_links = document
        .select(&next_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect();

    Ok(PageExtraction {
        text_blocks,
        forward_links,
    })
}

fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|e| FetchError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Renders an element's text roughly the way a browser's `innerText` does
///
/// Runs of whitespace collapse to one space, `<br>` and block elements
/// break lines, and every line is trimmed with blank lines dropped.
pub fn rendered_text(element: &ElementRef) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: &ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let mut words = text.split_whitespace().peekable();
                if words.peek().is_none() {
                    if !text.is_empty() && !out.ends_with([' ', '\n']) {
                        out.push(' ');
                    }
                    continue;
                }
                if text.starts_with(char::is_whitespace) && !out.ends_with([' ', '\n']) {
                    out.push(' ');
                }
                out.push_str(&words.collect::<Vec<_>>().join(" "));
                if text.ends_with(char::is_whitespace) {
                    out.push(' ');
                }
            }
            Node::Element(el) => {
                let name = el.name();
                if HIDDEN_ELEMENTS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let is_block = BLOCK_ELEMENTS.contains(&name);
                if is_block {
                    out.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(&child_ref, out);
                }
                if is_block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/serial/chapter-1").unwrap()
    }

    fn rules() -> ExtractionRules {
        ExtractionRules::new("div.story", "#next")
    }

    #[test]
    fn test_extracts_text_with_line_breaks() {
        let html = r#"<html><body><div class="story">
            <h2>Chapter 1: Arrival</h2>
            <p>The   train was
               late.</p>
            <p>Nobody<br>waited.</p>
        </div></body></html>"#;

        let page = extract_page(html, &base_url(), &rules()).unwrap();
        assert_eq!(
            page.text_blocks,
            vec!["Chapter 1: Arrival\nThe train was late.\nNobody\nwaited.".to_string()]
        );
    }

    #[test]
    fn test_inline_elements_keep_spacing() {
        let html = r#"<div class="story"><p>She said <em>no</em>, twice.</p></div>"#;
        let page = extract_page(html, &base_url(), &rules()).unwrap();
        assert_eq!(page.text_blocks, vec!["She said no, twice.".to_string()]);
    }

    #[test]
    fn test_skips_scripts_and_styles() {
        let html = r#"<div class="story"><script>var x = 1;</script><style>p{}</style><p>Text</p></div>"#;
        let page = extract_page(html, &base_url(), &rules()).unwrap();
        assert_eq!(page.text_blocks, vec!["Text".to_string()]);
    }

    #[test]
    fn test_multiple_blocks_in_document_order() {
        let html = r#"<div class="story">First</div><div class="story">   </div><div class="story">Second</div>"#;
        let page = extract_page(html, &base_url(), &rules()).unwrap();
        assert_eq!(
            page.text_blocks,
            vec!["First".to_string(), "Second".to_string()]
        );
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let html = r#"<html><body><p>Cloudflare says wait</p></body></html>"#;
        let page = extract_page(html, &base_url(), &rules()).unwrap();
        assert!(page.text_blocks.is_empty());
        assert!(page.forward_links.is_empty());
    }

    #[test]
    fn test_resolves_relative_next_link() {
        let html = r#"<div class="story">x</div><a id="next" href="chapter-2">Next</a>"#;
        let page = extract_page(html, &base_url(), &rules()).unwrap();
        assert_eq!(
            page.forward_links,
            vec!["https://example.com/serial/chapter-2".to_string()]
        );
    }

    #[test]
    fn test_keeps_absolute_next_link() {
        let html = r#"<a id="next" href="https://mirror.example.org/ch/2">Next</a>"#;
        let page = extract_page(html, &base_url(), &rules()).unwrap();
        assert_eq!(
            page.forward_links,
            vec!["https://mirror.example.org/ch/2".to_string()]
        );
    }

    #[test]
    fn test_skips_unusable_links() {
        let html = r##"
            <a class="nav" href="javascript:void(0)">x</a>
            <a class="nav" href="JavaScript:next()">x</a>
            <a class="nav" href="mailto:a@example.com">x</a>
            <a class="nav" href="#top">x</a>
            <a class="nav">no href</a>
            <a class="nav" href="/chapter-2">ok</a>
        "##;
        let rules = ExtractionRules::new("div.story", "a.nav");
        let page = extract_page(html, &base_url(), &rules).unwrap();
        assert_eq!(
            page.forward_links,
            vec!["https://example.com/chapter-2".to_string()]
        );
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let rules = ExtractionRules::new("div[", "#next");
        let result = extract_page("<p></p>", &base_url(), &rules);
        assert!(matches!(result, Err(FetchError::Selector { .. })));
    }
}
