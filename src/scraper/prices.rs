//! Pagination extractor for a submitted price search.

use super::cleaner::clean_price_rows;
use super::locators;
use super::parsers::{page_count, parse_price_table, parse_record_count};
use crate::browser::BrowserSession;
use crate::config::SettleTimings;
use crate::error::ScrapeError;
use crate::models::PriceRecord;
use crate::utils::dedup_by_key;
use tokio::time::sleep;
use tracing::{debug, info};

/// Walk every result page of the open price search and collect its rows.
///
/// An empty result (no `Total` in the heading) is `Ok(vec![])`. A next-page
/// control that disappears before `page_count` pages is an early end, not an
/// error. Records repeated verbatim across pages are kept once.
pub async fn extract_all(
    session: &mut dyn BrowserSession,
    state: &str,
    settle: &SettleTimings,
) -> Result<Vec<PriceRecord>, ScrapeError> {
    let heading = session.text_of(locators::RESULT_HEADING).await?;
    if !heading.contains("Total") {
        info!("No price data available: {:?}", heading.trim());
        return Ok(Vec::new());
    }

    let records = parse_record_count(&heading).ok_or_else(|| {
        ScrapeError::UnexpectedPage(format!("no record count in heading {:?}", heading))
    })?;
    let pages = page_count(records);
    info!("{} records over {} pages", records, pages);

    let mut collected = Vec::new();
    for page in 1..=pages {
        let html = session
            .outer_html(locators::PRICE_TABLE)
            .await?
            .ok_or_else(|| ScrapeError::ElementNotFound {
                locator: locators::PRICE_TABLE.to_string(),
            })?;

        let rows = parse_price_table(&html)
            .map_err(|e| ScrapeError::UnexpectedPage(format!("{:#}", e)))?;
        let before = collected.len();
        collected.extend(clean_price_rows(state, rows));
        debug!("Page {}/{}: {} records", page, pages, collected.len() - before);

        if page == pages {
            break;
        }
        if !session.click_if_present(locators::NEXT_PAGE).await? {
            debug!("Next-page control gone after page {} of {}", page, pages);
            break;
        }
        sleep(settle.page_turn).await;
    }

    Ok(dedup_prices(collected))
}

/// Keep the first of any records that agree on every field.
pub fn dedup_prices(records: Vec<PriceRecord>) -> Vec<PriceRecord> {
    dedup_by_key(records, PriceRecord::identity)
}
