//! File sink used when database writing is switched off.

use super::{RecordSink, WriteStats};
use crate::models::{ArrivalRecord, PriceRecord, ScrapeRequest};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// Writes each batch as one JSON array, named after what was scraped:
/// `<kind>_<commodity>_<state>_<start>_<end>.json`.
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_path(&self, kind: &str, request: &ScrapeRequest) -> PathBuf {
        let name = format!(
            "{}_{}_{}_{}_{}.json",
            kind,
            request.commodity.replace(' ', "_"),
            request.state.replace(' ', "_"),
            request.date_start,
            request.date_end,
        );
        self.dir.join(name)
    }

    fn write<T: Serialize>(&self, kind: &str, request: &ScrapeRequest, records: &[T]) -> Result<WriteStats> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Could not create dir {:?}", self.dir))?;

        let path = self.file_path(kind, request);
        let file = File::create(&path).with_context(|| format!("Could not create {:?}", path))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, records)
            .with_context(|| format!("Could not serialise {} to {:?}", kind, path))?;
        out.flush()?;

        info!("Wrote {} {} records to {:?}", records.len(), kind, path);
        Ok(WriteStats { written: records.len(), duplicates: 0 })
    }
}

impl RecordSink for JsonFileSink {
    fn write_prices(&self, request: &ScrapeRequest, records: &[PriceRecord]) -> Result<WriteStats> {
        self.write("prices", request, records)
    }

    fn write_arrivals(&self, request: &ScrapeRequest, records: &[ArrivalRecord]) -> Result<WriteStats> {
        self.write("arrivals", request, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde::de::DeserializeOwned;
    use std::io::BufReader;
    use std::path::Path;

    fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        let file = File::open(path).with_context(|| format!("Could not open {:?}", path))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Could not parse {:?}", path))
    }

    fn request() -> ScrapeRequest {
        ScrapeRequest::new(
            "Kinnow",
            "Himachal Pradesh",
            NaiveDate::from_ymd_opt(2020, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 7).unwrap(),
        )
    }

    #[test]
    fn test_file_name_encodes_state_and_range() {
        let sink = JsonFileSink::new("data");
        assert_eq!(
            sink.file_path("prices", &request()),
            PathBuf::from("data/prices_Kinnow_Himachal_Pradesh_2020-01-05_2020-01-07.json")
        );
    }

    #[test]
    fn test_prices_round_trip_through_file() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(tmp.path().join("nested/out"));
        let records = vec![
            PriceRecord {
                commodity: "Kinnow".into(),
                date: NaiveDate::from_ymd_opt(2020, 1, 5).unwrap(),
                state: "Himachal Pradesh".into(),
                district: "Solan".into(),
                market: "Solan".into(),
                grade: "FAQ".into(),
                variety: "Kinnow".into(),
                min_price: 1000.0,
                max_price: 1800.25,
                modal_price: 1400.1,
            },
            PriceRecord {
                market: "Parwanoo".into(),
                modal_price: 1350.0,
                ..records_seed()
            },
        ];

        let stats = sink.write_prices(&request(), &records).unwrap();
        assert_eq!(stats.written, 2);

        let back: Vec<PriceRecord> = read_records(&sink.file_path("prices", &request())).unwrap();
        assert_eq!(back, records);
    }

    fn records_seed() -> PriceRecord {
        PriceRecord {
            commodity: "Kinnow".into(),
            date: NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
            state: "Himachal Pradesh".into(),
            district: "Solan".into(),
            market: String::new(),
            grade: "FAQ".into(),
            variety: "Kinnow".into(),
            min_price: 900.0,
            max_price: 1500.0,
            modal_price: 0.0,
        }
    }

    #[test]
    fn test_full_precision_prices_survive_the_file() {
        // Thirds and raw bit patterns need every significant digit to come back.
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            f64::from_bits(0x4080_0000_0000_0000 | (state & 0x000F_FFFF_FFFF_FFFF))
        };

        let records: Vec<PriceRecord> = (0..2_000)
            .map(|i| PriceRecord {
                market: format!("Market {}", i),
                min_price: (900 + i) as f64 / 3.0,
                max_price: next(),
                modal_price: next() / 7.0,
                ..records_seed()
            })
            .collect();

        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(tmp.path());
        sink.write_prices(&request(), &records).unwrap();

        let back: Vec<PriceRecord> = read_records(&sink.file_path("prices", &request())).unwrap();
        assert_eq!(back.len(), records.len());
        for (got, want) in back.iter().zip(&records) {
            assert_eq!(got.min_price.to_bits(), want.min_price.to_bits(), "{}", want.market);
            assert_eq!(got.max_price.to_bits(), want.max_price.to_bits(), "{}", want.market);
            assert_eq!(got.modal_price.to_bits(), want.modal_price.to_bits(), "{}", want.market);
        }
    }

    #[test]
    fn test_arrivals_file_is_separate() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(tmp.path());
        let records = vec![ArrivalRecord {
            commodity: "Kinnow".into(),
            date: NaiveDate::from_ymd_opt(2020, 1, 5).unwrap(),
            state: "Himachal Pradesh".into(),
            district: None,
            market: "Solan".into(),
            quantity: 3.0,
        }];
        sink.write_arrivals(&request(), &records).unwrap();
        let back: Vec<ArrivalRecord> = read_records(&sink.file_path("arrivals", &request())).unwrap();
        assert_eq!(back, records);
        assert!(!sink.file_path("prices", &request()).exists());
    }
}
