pub mod json;

use crate::models::{ArrivalRecord, LocationEntry, LocationMap, PriceRecord, ScrapeRequest};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use duckdb::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

pub use self::json::JsonFileSink;

// ── Sink ──────────────────────────────────────────────────────────────────────

/// Rows accepted vs. rows already present under the same key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub written: usize,
    pub duplicates: usize,
}

impl std::ops::AddAssign for WriteStats {
    fn add_assign(&mut self, other: Self) {
        self.written += other.written;
        self.duplicates += other.duplicates;
    }
}

/// Where normalised records end up.
pub trait RecordSink {
    fn write_prices(&self, request: &ScrapeRequest, records: &[PriceRecord]) -> Result<WriteStats>;
    fn write_arrivals(&self, request: &ScrapeRequest, records: &[ArrivalRecord]) -> Result<WriteStats>;
}

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS prices (
    commodity   VARCHAR  NOT NULL,
    date        DATE     NOT NULL,
    state       VARCHAR  NOT NULL,
    district    VARCHAR  NOT NULL,
    market      VARCHAR  NOT NULL,
    grade       VARCHAR  NOT NULL,
    variety     VARCHAR  NOT NULL,
    min_price   DOUBLE,
    max_price   DOUBLE,
    modal_price DOUBLE,
    PRIMARY KEY (commodity, date, state, district, market, grade, variety)
);

-- district stays NULL for markets missing from location_map, so it cannot
-- sit in the key; a market belongs to exactly one district anyway.
CREATE TABLE IF NOT EXISTS arrivals (
    commodity   VARCHAR  NOT NULL,
    date        DATE     NOT NULL,
    state       VARCHAR  NOT NULL,
    district    VARCHAR,
    market      VARCHAR  NOT NULL,
    quantity    DOUBLE   NOT NULL,
    PRIMARY KEY (commodity, date, state, market)
);

CREATE TABLE IF NOT EXISTS location_map (
    state       VARCHAR  NOT NULL,
    district    VARCHAR  NOT NULL,
    market      VARCHAR  NOT NULL,
    PRIMARY KEY (state, district, market)
);

CREATE SEQUENCE IF NOT EXISTS scrape_run_ids START 1;

CREATE TABLE IF NOT EXISTS scrape_runs (
    id                  INTEGER PRIMARY KEY DEFAULT nextval('scrape_run_ids'),
    started_at          TIMESTAMP NOT NULL,
    finished_at         TIMESTAMP,
    status              VARCHAR NOT NULL DEFAULT 'running',
    pairs_processed     INTEGER DEFAULT 0,
    rows_written        INTEGER DEFAULT 0,
    error_msg           VARCHAR
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_prices_date     ON prices (date);
CREATE INDEX IF NOT EXISTS idx_prices_market   ON prices (market);
CREATE INDEX IF NOT EXISTS idx_arrivals_date   ON arrivals (date);
CREATE INDEX IF NOT EXISTS idx_arrivals_market ON arrivals (market);
"#;

// ── Repository ────────────────────────────────────────────────────────────────

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        self.conn.execute_batch(INDEXES).context("Index creation failed")?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, ?)",
            params![Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    // ── Prices ────────────────────────────────────────────────────────────────

    /// Insert row by row; a key already present is counted and skipped.
    pub fn insert_prices(&self, records: &[PriceRecord]) -> Result<WriteStats> {
        let mut stats = WriteStats::default();
        if records.is_empty() { return Ok(stats); }

        let tx = self.conn.unchecked_transaction()?;
        let sql = r#"
            INSERT OR IGNORE INTO prices
                (commodity, date, state, district, market, grade, variety,
                 min_price, max_price, modal_price)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        for r in records {
            let changed = tx.execute(sql, params![
                r.commodity, r.date, r.state, r.district, r.market, r.grade, r.variety,
                r.min_price, r.max_price, r.modal_price,
            ]).with_context(|| format!("insert price {} {} {}", r.market, r.variety, r.date))?;

            if changed == 0 {
                debug!("Duplicate price row skipped: {} {} {}", r.market, r.variety, r.date);
                stats.duplicates += 1;
            } else {
                stats.written += 1;
            }
        }

        tx.commit()?;
        Ok(stats)
    }

    // ── Arrivals ──────────────────────────────────────────────────────────────

    pub fn insert_arrivals(&self, records: &[ArrivalRecord]) -> Result<WriteStats> {
        let mut stats = WriteStats::default();
        if records.is_empty() { return Ok(stats); }

        let tx = self.conn.unchecked_transaction()?;
        let sql = r#"
            INSERT OR IGNORE INTO arrivals
                (commodity, date, state, district, market, quantity)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;

        for r in records {
            let changed = tx.execute(sql, params![
                r.commodity, r.date, r.state, r.district, r.market, r.quantity,
            ]).with_context(|| format!("insert arrival {} {}", r.market, r.date))?;

            if changed == 0 {
                debug!("Duplicate arrival row skipped: {} {}", r.market, r.date);
                stats.duplicates += 1;
            } else {
                stats.written += 1;
            }
        }

        tx.commit()?;
        Ok(stats)
    }

    // ── Location reference ────────────────────────────────────────────────────

    pub fn upsert_locations(&self, entries: &[LocationEntry]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut added = 0usize;
        for e in entries {
            added += tx.execute(
                "INSERT OR IGNORE INTO location_map (state, district, market) VALUES (?, ?, ?)",
                params![e.state, e.district, e.market],
            ).with_context(|| format!("insert location {} / {}", e.district, e.market))?;
        }
        tx.commit()?;
        Ok(added)
    }

    /// Every (state, district, market) triple, in insertion order.
    pub fn location_entries(&self) -> Result<Vec<LocationEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT state, district, market FROM location_map ORDER BY rowid")?;
        let entries = stmt
            .query_map([], |r| {
                Ok(LocationEntry {
                    state: r.get(0)?,
                    district: r.get(1)?,
                    market: r.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn load_location_map(&self) -> Result<LocationMap> {
        Ok(LocationMap::from_entries(self.location_entries()?))
    }

    // ── Stats ─────────────────────────────────────────────────────────────────

    fn count(&self, table: &str) -> Result<i64> {
        let mut s = self.conn.prepare(&format!("SELECT COUNT(*) FROM {}", table))?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn price_count(&self) -> Result<i64> {
        self.count("prices")
    }

    pub fn arrival_count(&self) -> Result<i64> {
        self.count("arrivals")
    }

    pub fn location_count(&self) -> Result<i64> {
        self.count("location_map")
    }

    pub fn price_date_range(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        let mut s = self.conn.prepare("SELECT MIN(date), MAX(date) FROM prices")?;
        Ok(s.query_row([], |r| Ok((r.get(0)?, r.get(1)?)))?)
    }

    pub fn arrival_date_range(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        let mut s = self.conn.prepare("SELECT MIN(date), MAX(date) FROM arrivals")?;
        Ok(s.query_row([], |r| Ok((r.get(0)?, r.get(1)?)))?)
    }

    // ── Scrape run log ────────────────────────────────────────────────────────

    pub fn begin_scrape_run(&self) -> Result<i64> {
        let id: i64 = self.conn.query_row(
            "INSERT INTO scrape_runs (started_at, status) VALUES (?, 'running') RETURNING id",
            params![Utc::now().naive_utc()],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    pub fn finish_scrape_run(
        &self, run_id: i64, pairs: usize, rows: usize, error: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            r#"UPDATE scrape_runs SET
               finished_at = ?, status = ?,
               pairs_processed = ?, rows_written = ?, error_msg = ?
               WHERE id = ?"#,
            params![
                Utc::now().naive_utc(),
                if error.is_none() { "success" } else { "error" },
                pairs as i64, rows as i64, error, run_id,
            ],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn scrape_run_status(&self, run_id: i64) -> Result<String> {
        Ok(self.conn.query_row(
            "SELECT status FROM scrape_runs WHERE id = ?",
            params![run_id],
            |r| r.get(0),
        )?)
    }
}

impl RecordSink for Repository {
    fn write_prices(&self, _request: &ScrapeRequest, records: &[PriceRecord]) -> Result<WriteStats> {
        self.insert_prices(records)
    }

    fn write_arrivals(&self, _request: &ScrapeRequest, records: &[ArrivalRecord]) -> Result<WriteStats> {
        self.insert_arrivals(records)
    }
}
