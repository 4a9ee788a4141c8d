//! Session driver: fills and submits the search form on an open page.

use super::locators;
use crate::browser::BrowserSession;
use crate::config::SettleTimings;
use crate::error::ScrapeError;
use crate::models::{ScrapeMode, ScrapeRequest};
use crate::utils::format_site_date;
use tokio::time::sleep;
use tracing::debug;

/// Navigate to `base_url` and submit a `mode` search for `request`.
///
/// Every step waits for its control; the settle pauses cover the page's own
/// reload after dropdown changes and after the end date is confirmed.
pub async fn open_search(
    session: &mut dyn BrowserSession,
    base_url: &str,
    request: &ScrapeRequest,
    mode: ScrapeMode,
    settle: &SettleTimings,
) -> Result<(), ScrapeError> {
    session.navigate(base_url).await?;

    session.select_option(locators::SCRAPE_TYPE, mode.label()).await?;
    session.select_option(locators::COMMODITY, &request.commodity).await?;
    session.select_option(locators::STATE, &request.state).await?;
    sleep(settle.dropdown).await;

    let from = format_site_date(request.date_start);
    let to = format_site_date(request.date_end);
    session.set_text(locators::DATE_FROM, &from).await?;
    session.set_text(locators::DATE_TO, &to).await?;
    sleep(settle.date_entry).await;
    session.submit(locators::DATE_TO).await?;
    sleep(settle.date_entry).await;

    debug!(
        "{} search submitted: {} / {} ({} → {})",
        mode.label(),
        request.commodity,
        request.state,
        from,
        to
    );
    Ok(())
}
