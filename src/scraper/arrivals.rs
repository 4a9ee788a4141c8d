//! Hierarchical unfurler for a submitted arrivals search.

use super::locators;
use crate::browser::{BrowserSession, Element};
use crate::config::SettleTimings;
use crate::error::ScrapeError;
use crate::models::{ArrivalDaySnapshot, ArrivalPair, ScrapeRequest};
use std::collections::HashMap;
use tokio::time::sleep;
use tracing::debug;

/// Expand the whole arrivals tree, then read its (market, quantity) leaves.
pub async fn unfurl_and_extract(
    session: &mut dyn BrowserSession,
    request: &ScrapeRequest,
    settle: &SettleTimings,
) -> Result<ArrivalDaySnapshot, ScrapeError> {
    let expanded = unfurl(session, settle).await?;
    debug!("Expanded {} nodes", expanded);

    let markets = session.find_all(locators::MARKET_NAMES).await?;
    let quantities = session.find_all(locators::ARRIVAL_QUANTITIES).await?;
    let pairs = pair_arrivals(markets, quantities)?;

    Ok(ArrivalDaySnapshot {
        commodity: request.commodity.clone(),
        state: request.state.clone(),
        date: request.date_start,
        pairs,
    })
}

/// Activate expand controls until none is left. Returns how many were opened.
///
/// The depth and width of the tree are unknown up front, so the only stop
/// condition is the control no longer being rendered.
pub async fn unfurl(
    session: &mut dyn BrowserSession,
    settle: &SettleTimings,
) -> Result<usize, ScrapeError> {
    let mut expanded = 0usize;
    while session.click_if_present(locators::EXPAND).await? {
        expanded += 1;
        sleep(settle.expand).await;
    }
    Ok(expanded)
}

/// Row part of a span id: the id with its field segment removed.
/// `cphBody_Grid_ctl03_LabMarketName` → `cphBody_Grid_ctl03`
pub fn row_key(id: &str, token: &str) -> Option<String> {
    let segments: Vec<&str> = id.split('_').collect();
    let field = segments.iter().position(|s| s.contains(token))?;
    let key: Vec<&str> = segments
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != field)
        .map(|(_, s)| *s)
        .collect();
    Some(key.join("_"))
}

fn keyed(elements: &[Element], token: &str) -> Option<HashMap<String, usize>> {
    let mut keys = HashMap::with_capacity(elements.len());
    for (i, el) in elements.iter().enumerate() {
        let key = row_key(el.id.as_deref()?, token)?;
        if keys.insert(key, i).is_some() {
            return None;
        }
    }
    Some(keys)
}

/// Join market spans to quantity spans.
///
/// By row id when every span has a usable, unique one; by position otherwise,
/// and then only when both columns have the same length.
pub fn pair_arrivals(
    markets: Vec<Element>,
    quantities: Vec<Element>,
) -> Result<Vec<ArrivalPair>, ScrapeError> {
    let misaligned = ScrapeError::MisalignedArrivals {
        markets: markets.len(),
        quantities: quantities.len(),
    };

    let by_id = keyed(&markets, locators::MARKET_ID_TOKEN)
        .zip(keyed(&quantities, locators::QUANTITY_ID_TOKEN));

    if let Some((market_keys, quantity_keys)) = by_id {
        if market_keys.len() != quantity_keys.len() {
            return Err(misaligned);
        }
        let mut pairs = Vec::with_capacity(markets.len());
        for market in &markets {
            let Some(key) = market
                .id
                .as_deref()
                .and_then(|id| row_key(id, locators::MARKET_ID_TOKEN))
            else {
                return Err(misaligned);
            };
            let Some(&q) = quantity_keys.get(&key) else {
                return Err(misaligned);
            };
            pairs.push(ArrivalPair {
                market: market.text.trim().to_string(),
                quantity_raw: quantities[q].text.trim().to_string(),
            });
        }
        return Ok(pairs);
    }

    if markets.len() != quantities.len() {
        return Err(misaligned);
    }
    debug!("Arrival spans lack row ids; pairing by position");
    Ok(markets
        .into_iter()
        .zip(quantities)
        .map(|(m, q)| ArrivalPair {
            market: m.text.trim().to_string(),
            quantity_raw: q.text.trim().to_string(),
        })
        .collect())
}
