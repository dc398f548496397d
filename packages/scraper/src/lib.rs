#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Generic web fetching and parsing framework for economic data sources.
//!
//! Provides the shared HTTP helpers ([`http`]), HTML wide-table extraction
//! ([`html_table`]), and the first-success candidate combinator
//! ([`candidates`]) used when the correct target URL cannot be determined
//! deterministically in advance.
//!
//! This crate is a pure fetching library with no awareness of indicators or
//! the store. It returns raw strings, JSON values, and [`html_table::WideTable`]
//! structures that callers normalize however they like.

pub mod candidates;
pub mod html_table;
pub mod http;

use scraper::Html;

/// Errors that can occur during scraping operations.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed at the transport level.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered 404 — expected for unpublished periods.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server answered a non-retryable error status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// The response status code.
        status: reqwest::StatusCode,
        /// The requested URL.
        url: String,
    },

    /// Parsing the response body failed.
    #[error("parse error: {0}")]
    Parse(String),
}

impl ScrapeError {
    /// Whether this error is an expected "nothing published here" miss
    /// rather than a real failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Extracts the visible text of an HTML document as a single string.
///
/// Used by the narrative-report adapters, which mine free text rather than
/// structured markup.
#[must_use]
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();
    for fragment in document.root_element().text() {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(fragment);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_text_flattens_markup() {
        let html = "<html><body><h1>PMI</h1><p>registered <b>48.7</b> percent</p></body></html>";
        assert_eq!(page_text(html), "PMI registered 48.7 percent");
    }

    #[test]
    fn page_text_skips_blank_nodes() {
        let html = "<div>\n  <span>a</span>\n\n  <span>b</span>\n</div>";
        assert_eq!(page_text(html), "a b");
    }
}
