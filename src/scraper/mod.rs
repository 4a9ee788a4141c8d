pub mod arrivals;
pub mod cleaner;
pub mod form;
pub mod locators;
pub mod parsers;
pub mod prices;

use crate::browser::{release, BrowserSession, SessionLauncher};
use crate::config::{ScraperConfig, SettleTimings};
use crate::error::ScrapeError;
use crate::models::{ArrivalDaySnapshot, PriceRecord, ScrapeMode, ScrapeRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Rows per result page; fixed by the site.
pub const PAGE_SIZE: usize = 50;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable data source abstraction.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// All price rows for the request's full date range.
    async fn fetch_prices(&self, request: &ScrapeRequest) -> Result<Vec<PriceRecord>, ScrapeError>;

    /// The arrivals tree for `request.date_start` alone.
    async fn fetch_arrival_day(&self, request: &ScrapeRequest) -> Result<ArrivalDaySnapshot, ScrapeError>;
}

// ── agmarknet scraper ─────────────────────────────────────────────────────────

/// Drives the agmarknet search form. Each fetch gets its own browser session,
/// closed before the fetch returns.
pub struct MandiScraper {
    launcher: Arc<dyn SessionLauncher>,
    base_url: String,
    settle: SettleTimings,
}

impl MandiScraper {
    pub fn new(launcher: Arc<dyn SessionLauncher>, config: &ScraperConfig) -> Self {
        Self::with_timings(launcher, &config.base_url, config.settle_timings())
    }

    pub fn with_timings(launcher: Arc<dyn SessionLauncher>, base_url: &str, settle: SettleTimings) -> Self {
        Self {
            launcher,
            base_url: base_url.to_string(),
            settle,
        }
    }

    async fn search_prices(
        &self,
        session: &mut dyn BrowserSession,
        request: &ScrapeRequest,
    ) -> Result<Vec<PriceRecord>, ScrapeError> {
        form::open_search(session, &self.base_url, request, ScrapeMode::Price, &self.settle).await?;
        prices::extract_all(session, &request.state, &self.settle).await
    }

    async fn search_arrivals(
        &self,
        session: &mut dyn BrowserSession,
        request: &ScrapeRequest,
    ) -> Result<ArrivalDaySnapshot, ScrapeError> {
        form::open_search(session, &self.base_url, request, ScrapeMode::Arrival, &self.settle).await?;
        arrivals::unfurl_and_extract(session, request, &self.settle).await
    }
}

#[async_trait]
impl MarketSource for MandiScraper {
    async fn fetch_prices(&self, request: &ScrapeRequest) -> Result<Vec<PriceRecord>, ScrapeError> {
        info!(
            "Prices: {} / {} ({} → {})",
            request.commodity, request.state, request.date_start, request.date_end
        );
        let mut session = self.launcher.launch().await?;
        let result = self.search_prices(session.as_mut(), request).await;
        release(session).await;
        result
    }

    async fn fetch_arrival_day(&self, request: &ScrapeRequest) -> Result<ArrivalDaySnapshot, ScrapeError> {
        info!(
            "Arrivals: {} / {} on {}",
            request.commodity, request.state, request.date_start
        );
        let mut session = self.launcher.launch().await?;
        let result = self.search_arrivals(session.as_mut(), request).await;
        release(session).await;
        result
    }
}
