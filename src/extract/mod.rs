//! Content extraction for fetched documents
//!
//! This module turns raw response bodies into indexable text:
//! - HTML: title, visible text, and absolute outbound links
//! - PDF: staged to disk under a URL-derived name, then text-extracted
//!
//! Extraction never fails outward. Malformed input yields empty text, which
//! the crawl treats as "nothing to index".

mod html;
mod pdf;

pub use html::{parse_html, ParsedPage};
pub use pdf::{parse_pdf, stage_pdf, staged_pdf_name};

/// Collapses every whitespace run to a single space and trims the ends
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// How a fetched body should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Pdf,
    Other,
}

impl ContentKind {
    /// Classifies a response by its declared content type, falling back to
    /// the `.pdf` URL suffix for PDFs served with a generic type
    pub fn classify(content_type: &str, url: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("text/html") {
            Self::Html
        } else if content_type.contains("application/pdf")
            || url.to_ascii_lowercase().ends_with(".pdf")
        {
            Self::Pdf
        } else {
            Self::Other
        }
    }
}
