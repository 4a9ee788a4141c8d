//! Browser automation capability consumed by the scrapers.
//!
//! `BrowserSession` is the narrow surface the form driver and extractors need;
//! `webdriver` implements it over fantoccini. A session is exclusively owned by
//! one unit of work and is always handed to [`release`] when that work ends.

pub mod webdriver;

#[cfg(test)]
pub mod fake;

use crate::error::ScrapeError;
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, warn};

// ── Locators ──────────────────────────────────────────────────────────────────

/// Site-specific element identifier. Treated as an opaque constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(&'static str),
    Css(&'static str),
    XPath(&'static str),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(s) => write!(f, "id={}", s),
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// What the extractors need from a located element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: Option<String>,
    pub text: String,
}

impl Element {
    #[cfg(test)]
    pub fn new(id: Option<&str>, text: &str) -> Self {
        Self {
            id: id.map(str::to_string),
            text: text.to_string(),
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// One focused browser page. Every call blocks the caller until the underlying
/// command completes; required elements are waited for before acting on them.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Pick the option whose visible text equals `visible_text` exactly.
    async fn select_option(&mut self, locator: Locator, visible_text: &str) -> Result<(), ScrapeError>;

    /// Replace the contents of a text field.
    async fn set_text(&mut self, locator: Locator, value: &str) -> Result<(), ScrapeError>;

    /// Press Enter in a field.
    async fn submit(&mut self, locator: Locator) -> Result<(), ScrapeError>;

    /// Click the first match if one is rendered right now. `Ok(false)` means the
    /// control is absent, which callers treat as a boundary, not a failure.
    async fn click_if_present(&mut self, locator: Locator) -> Result<bool, ScrapeError>;

    /// All current matches, in document order. No waiting; may be empty.
    async fn find_all(&mut self, locator: Locator) -> Result<Vec<Element>, ScrapeError>;

    async fn text_of(&mut self, locator: Locator) -> Result<String, ScrapeError>;

    /// Outer HTML of the first match, `None` when nothing matches.
    async fn outer_html(&mut self, locator: Locator) -> Result<Option<String>, ScrapeError>;

    async fn close(self: Box<Self>) -> Result<(), ScrapeError>;
}

/// Opens fresh browser sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScrapeError>;
}

/// Close a session once its unit of work is over, successful or not.
///
/// Callers keep the work's result aside, release, then return that result; a
/// failure to close is logged and never replaces it.
pub async fn release(session: Box<dyn BrowserSession>) {
    match session.close().await {
        Ok(()) => debug!("Browser session closed"),
        Err(e) => warn!("Failed to close browser session: {}", e),
    }
}
