//! HTML parser for extracting title, text and links

use super::clean_text;
use scraper::{Html, Node, Selector};
use url::Url;

/// Elements whose text content is never visible
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The `<title>` text, or the page URL when the title is missing or blank
    pub title: String,

    /// Visible text with whitespace collapsed
    pub text: String,

    /// All `<a href>` targets resolved against the page URL
    pub links: Vec<String>,
}

/// Parses HTML content and extracts title, text and links
///
/// # Link Extraction Rules
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that does not resolve to `http` or `https`
///
/// Fragments on otherwise valid links are kept here; the frontier strips
/// them before admission.
///
/// # Example
///
/// ```
/// use kumo_index::extract::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(&base_url, html);
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(base_url: &Url, html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document).unwrap_or_else(|| base_url.to_string());
    let text = extract_text(&document);
    let links = extract_links(&document, base_url);

    ParsedPage { title, text, links }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| clean_text(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Concatenates every visible text node, separated by spaces
fn extract_text(document: &Html) -> String {
    let mut raw = String::new();

    for node in document.tree.root().descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map_or(false, |el| HIDDEN_ELEMENTS.contains(&el.name()))
            });
            if hidden {
                continue;
            }
            raw.push_str(text);
            raw.push(' ');
        }
    }

    clean_text(&raw)
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    // Same page anchors
    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
