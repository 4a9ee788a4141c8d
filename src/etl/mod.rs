//! Turns scraped snapshots into the records handed to storage.

use crate::error::ScrapeError;
use crate::models::{ArrivalDaySnapshot, ArrivalRecord, LocationMap, PriceRecord};
use crate::scraper::prices::dedup_prices;
use crate::utils::dedup_by_key;
use tracing::{debug, warn};

/// Arrival quantity as a float. Thousands separators are tolerated; anything
/// else non-numeric (including "NaN"/"inf") is rejected.
pub fn parse_quantity(market: &str, raw: &str) -> Result<f64, ScrapeError> {
    let cleaned = raw.trim().replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(q) if q.is_finite() => Ok(q),
        _ => Err(ScrapeError::QuantityParse {
            market: market.to_string(),
            raw: raw.to_string(),
        }),
    }
}

/// Flatten day snapshots into arrival records.
///
/// Rows whose quantity will not parse are logged and dropped; markets missing
/// from `locations` are kept with no district. Fully identical rows collapse
/// to one. Output never has more rows than the input had pairs.
pub fn normalize_arrivals(snapshots: &[ArrivalDaySnapshot], locations: &LocationMap) -> Vec<ArrivalRecord> {
    let mut records = Vec::new();
    let mut unparsable = 0usize;
    let mut unmapped = 0usize;

    for snap in snapshots {
        for pair in &snap.pairs {
            let quantity = match parse_quantity(&pair.market, &pair.quantity_raw) {
                Ok(q) => q,
                Err(e) => {
                    warn!("{} {} {}: {}", snap.commodity, snap.state, snap.date, e);
                    unparsable += 1;
                    continue;
                }
            };

            let district = locations.district_for(&pair.market).map(str::to_string);
            if district.is_none() {
                unmapped += 1;
            }

            records.push(ArrivalRecord {
                commodity: snap.commodity.clone(),
                date: snap.date,
                state: snap.state.clone(),
                district,
                market: pair.market.clone(),
                quantity,
            });
        }
    }

    let before = records.len();
    let records = dedup_by_key(records, ArrivalRecord::identity);
    debug!(
        "Normalised {} arrivals ({} unparsable, {} without district, {} duplicates)",
        records.len(),
        unparsable,
        unmapped,
        before - records.len()
    );
    records
}

/// Price rows are already typed by the extractor; this only re-applies the
/// exact-duplicate filter so records merged from several runs stay unique.
pub fn normalize_prices(records: Vec<PriceRecord>) -> Vec<PriceRecord> {
    dedup_prices(records)
}
