use crate::models::{PriceRecord, RawPriceRow};
use chrono::NaiveDate;
use tracing::warn;

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Parse a price cell: thousands separators and currency noise are stripped.
/// "1,234.50" → 1234.5 | "Rs 900" → 900.0
pub fn parse_price(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "N/A" || s == "-" || s == "—" {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

/// Parse table dates: "05 Jan 2020", "05-Jan-2020", "05/01/2020" or ISO.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    for fmt in ["%d %b %Y", "%d-%b-%Y", "%d/%m/%Y", "%Y-%m-%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    None
}

fn text(cell: &Option<String>) -> Option<String> {
    cell.as_deref().map(|s| s.trim().to_string())
}

// ── Price row → PriceRecord ───────────────────────────────────────────────────

pub fn price_row_to_record(state: &str, row: &RawPriceRow) -> Option<PriceRecord> {
    let date_str = row.date.as_deref()?;
    let Some(date) = parse_date(date_str) else {
        warn!("Unreadable price date {:?} in {}", date_str, state);
        return None;
    };

    let prices = (
        row.min_price.as_deref().and_then(parse_price),
        row.max_price.as_deref().and_then(parse_price),
        row.modal_price.as_deref().and_then(parse_price),
    );
    let (Some(min_price), Some(max_price), Some(modal_price)) = prices else {
        warn!(
            "Unreadable prices {:?}/{:?}/{:?} for {:?} on {}",
            row.min_price, row.max_price, row.modal_price, row.market, date
        );
        return None;
    };

    Some(PriceRecord {
        commodity: text(&row.commodity)?,
        date,
        state: state.to_string(),
        district: text(&row.district)?,
        market: text(&row.market)?,
        grade: text(&row.grade)?,
        variety: text(&row.variety)?,
        min_price,
        max_price,
        modal_price,
    })
}

pub fn clean_price_rows(state: &str, rows: Vec<RawPriceRow>) -> Vec<PriceRecord> {
    rows.iter()
        .filter_map(|row| price_row_to_record(state, row))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
