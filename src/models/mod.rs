use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Request ───────────────────────────────────────────────────────────────────

/// Which flavour of the search form to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrapeMode {
    Price,
    Arrival,
}

impl ScrapeMode {
    /// Visible label of the matching option in the scrape-type dropdown.
    pub fn label(self) -> &'static str {
        match self {
            ScrapeMode::Price => "Price",
            ScrapeMode::Arrival => "Arrival",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub commodity: String,
    pub state: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
}

impl ScrapeRequest {
    pub fn new(
        commodity: impl Into<String>,
        state: impl Into<String>,
        date_start: NaiveDate,
        date_end: NaiveDate,
    ) -> Self {
        Self {
            commodity: commodity.into(),
            state: state.into(),
            date_start,
            date_end,
        }
    }

    /// Same commodity and state, narrowed to one calendar day.
    pub fn for_day(&self, day: NaiveDate) -> Self {
        Self {
            date_start: day,
            date_end: day,
            ..self.clone()
        }
    }
}

// ── Prices ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRecord {
    pub commodity: String,
    pub date: NaiveDate,
    pub state: String,
    pub district: String,
    pub market: String,
    pub grade: String,
    pub variety: String,
    pub min_price: f64,
    pub max_price: f64,
    pub modal_price: f64,
}

impl PriceRecord {
    /// Every field, floats by bit pattern, so identical rows hash identically.
    pub fn identity(&self) -> (String, NaiveDate, String, String, String, String, String, [u64; 3]) {
        (
            self.commodity.clone(),
            self.date,
            self.state.clone(),
            self.district.clone(),
            self.market.clone(),
            self.grade.clone(),
            self.variety.clone(),
            [
                self.min_price.to_bits(),
                self.max_price.to_bits(),
                self.modal_price.to_bits(),
            ],
        )
    }
}

/// One `<tr>` of the price table, cell text untouched.
#[derive(Debug, Clone, Default)]
pub struct RawPriceRow {
    pub district: Option<String>,
    pub market: Option<String>,
    pub commodity: Option<String>,
    pub variety: Option<String>,
    pub grade: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub modal_price: Option<String>,
    pub date: Option<String>,
}

// ── Arrivals ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArrivalPair {
    pub market: String,
    pub quantity_raw: String,
}

/// Everything visible in the arrivals tree for one day, before type coercion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArrivalDaySnapshot {
    pub commodity: String,
    pub state: String,
    pub date: NaiveDate,
    pub pairs: Vec<ArrivalPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArrivalRecord {
    pub commodity: String,
    pub date: NaiveDate,
    pub state: String,
    pub district: Option<String>,
    pub market: String,
    pub quantity: f64,
}

impl ArrivalRecord {
    pub fn identity(&self) -> (String, NaiveDate, String, Option<String>, String, u64) {
        (
            self.commodity.clone(),
            self.date,
            self.state.clone(),
            self.district.clone(),
            self.market.clone(),
            self.quantity.to_bits(),
        )
    }
}

// ── Location reference ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub state: String,
    pub district: String,
    pub market: String,
}

/// Market name → district, read-only for the length of a run.
///
/// Built in entry order; a market listed under several districts keeps the last one.
#[derive(Debug, Clone, Default)]
pub struct LocationMap {
    districts: HashMap<String, String>,
}

impl LocationMap {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = LocationEntry>,
    {
        let districts = entries
            .into_iter()
            .map(|e| (e.market, e.district))
            .collect();
        Self { districts }
    }

    pub fn district_for(&self, market: &str) -> Option<&str> {
        self.districts.get(market).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(district: &str, market: &str) -> LocationEntry {
        LocationEntry {
            state: "Punjab".into(),
            district: district.into(),
            market: market.into(),
        }
    }

    #[test]
    fn test_location_map_last_write_wins() {
        let map = LocationMap::from_entries(vec![
            entry("Bathinda", "Malout"),
            entry("Sri Muktsar Sahib", "Malout"),
            entry("Fazilka", "Abohar"),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.district_for("Malout"), Some("Sri Muktsar Sahib"));
        assert_eq!(map.district_for("Abohar"), Some("Fazilka"));
        assert_eq!(map.district_for("Ludhiana"), None);
    }

    #[test]
    fn test_for_day_narrows_range() {
        let req = ScrapeRequest::new(
            "Kinnow",
            "Punjab",
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
        );
        let day = NaiveDate::from_ymd_opt(2020, 1, 5).unwrap();
        let narrowed = req.for_day(day);
        assert_eq!(narrowed.date_start, day);
        assert_eq!(narrowed.date_end, day);
        assert_eq!(narrowed.commodity, "Kinnow");
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(ScrapeMode::Price.label(), "Price");
        assert_eq!(ScrapeMode::Arrival.label(), "Arrival");
    }
}
