//! Page-content scanners.
//!
//! A scanner looks at whatever the agent currently has open and returns
//! text that can seed the first search. Its output is only ever used as a
//! query string.

use std::path::PathBuf;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use stepguide_shared::{Result, StepGuideError};
use tracing::{debug, instrument};

/// Capability interface for page-content scanning.
pub trait ContentScanner: Send + Sync {
    /// Return text suitable as a search query, or `None` if nothing useful was found.
    fn scan(&self) -> Result<Option<String>>;

    /// Human-readable scanner name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Static scanner
// ---------------------------------------------------------------------------

/// Mock scanner returning a fixed value.
#[derive(Debug, Clone, Default)]
pub struct StaticScanner {
    content: Option<String>,
}

impl StaticScanner {
    pub fn new(content: Option<String>) -> Self {
        Self { content }
    }
}

impl ContentScanner for StaticScanner {
    fn scan(&self) -> Result<Option<String>> {
        Ok(self.content.clone().filter(|c| !c.trim().is_empty()))
    }

    fn name(&self) -> &str {
        "static"
    }
}

// ---------------------------------------------------------------------------
// HTML page scanner
// ---------------------------------------------------------------------------

/// Reads an HTML page from disk and pulls out its title, headings, and any
/// error/alert banners.
#[derive(Debug, Clone)]
pub struct HtmlPageScanner {
    path: PathBuf,
}

impl HtmlPageScanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ContentScanner for HtmlPageScanner {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn scan(&self) -> Result<Option<String>> {
        let html =
            std::fs::read_to_string(&self.path).map_err(|e| StepGuideError::io(&self.path, e))?;
        let text = extract_page_text(&html);
        debug!(found = text.is_some(), "page scanned");
        Ok(text)
    }

    fn name(&self) -> &str {
        "html-page"
    }
}

/// Extract query-worthy text from an HTML document.
pub fn extract_page_text(html: &str) -> Option<String> {
    static INTERESTING: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "title, h1, h2, h3, [class*=error], [class*=alert], [id*=error], [id*=alert]",
        )
        .expect("valid selector")
    });

    let doc = Html::parse_document(html);
    let mut pieces: Vec<String> = Vec::new();

    for el in doc.select(&INTERESTING) {
        let text = collapse_whitespace(&el.text().collect::<String>());
        if !text.is_empty() && !pieces.contains(&text) {
            pieces.push(text);
        }
    }

    if pieces.is_empty() {
        None
    } else {
        Some(pieces.join(" "))
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
