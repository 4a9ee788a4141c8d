//! Pipeline orchestrator: ties scraper → normaliser → sink together.
//!
//! ## Run shape
//!
//! `run()` walks every {state} × {commodity} pair in the plan:
//!   1. Prices: one search over the whole date range, paginated, deduplicated.
//!   2. Arrivals: one search per day (`collect_arrivals`), each day in its own
//!      browser session, then district lookup and normalisation.
//!   A pair that fails is logged and abandoned; the remaining pairs still run.

use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::etl::{normalize_arrivals, normalize_prices};
use crate::models::{ArrivalDaySnapshot, LocationMap, ScrapeRequest};
use crate::scraper::MarketSource;
use crate::storage::{RecordSink, WriteStats};
use crate::utils::day_range;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tracing::{info, warn};

// ── Plan & pacing ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RunPlan {
    pub states: Vec<String>,
    pub commodities: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub prices: bool,
    pub arrivals: bool,
}

/// Delays that bound the request rate against the site, plus the day retry policy.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub inter_day: Duration,
    pub inter_pair: Duration,
    pub jitter_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Pacing {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            inter_day: Duration::from_millis(config.inter_day_delay_ms),
            inter_pair: Duration::from_millis(config.inter_pair_delay_ms),
            jitter_ms: config.jitter_ms,
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        }
    }

    /// No waiting anywhere, `max_retries` retries per day.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            inter_day: Duration::ZERO,
            inter_pair: Duration::ZERO,
            jitter_ms: 0,
            max_retries,
            retry_delay_ms: 0,
        }
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::rng().random_range(0..=self.jitter_ms))
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Snapshots for the days that succeeded, in date order, and the days given up on.
#[derive(Debug, Default)]
pub struct ArrivalRange {
    pub snapshots: Vec<ArrivalDaySnapshot>,
    pub skipped_days: Vec<NaiveDate>,
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub pairs_processed: usize,
    pub pairs_failed: usize,
    pub prices: WriteStats,
    pub arrivals: WriteStats,
    pub days_skipped: usize,
}

impl PipelineStats {
    pub fn rows_written(&self) -> usize {
        self.prices.written + self.arrivals.written
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct Pipeline<'a> {
    source: &'a dyn MarketSource,
    sink: &'a dyn RecordSink,
    locations: LocationMap,
    pacing: Pacing,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn MarketSource,
        sink: &'a dyn RecordSink,
        locations: LocationMap,
        pacing: Pacing,
    ) -> Self {
        Self { source, sink, locations, pacing }
    }

    pub async fn run(&self, plan: &RunPlan) -> PipelineStats {
        let mut stats = PipelineStats::default();
        let pairs: Vec<(&String, &String)> = plan
            .states
            .iter()
            .flat_map(|s| plan.commodities.iter().map(move |c| (s, c)))
            .collect();

        info!(
            "=== {} pairs, {} → {} (locations: {} markets) ===",
            pairs.len(), plan.start, plan.end, self.locations.len()
        );

        for (i, (state, commodity)) in pairs.iter().enumerate() {
            if i > 0 {
                sleep(self.pacing.jittered(self.pacing.inter_pair)).await;
            }

            let request = ScrapeRequest::new(commodity.as_str(), state.as_str(), plan.start, plan.end);
            info!("=== {} / {} ===", state, commodity);

            match self.run_pair(&request, plan, &mut stats).await {
                Ok(()) => stats.pairs_processed += 1,
                Err(e) => {
                    warn!("{} / {} abandoned: {:#}", state, commodity, e);
                    stats.pairs_failed += 1;
                }
            }
        }

        info!(
            "=== Done: {} pairs ok, {} failed | prices {} (+{} dup) | arrivals {} (+{} dup) | {} days skipped ===",
            stats.pairs_processed, stats.pairs_failed,
            stats.prices.written, stats.prices.duplicates,
            stats.arrivals.written, stats.arrivals.duplicates,
            stats.days_skipped,
        );
        stats
    }

    async fn run_pair(&self, request: &ScrapeRequest, plan: &RunPlan, stats: &mut PipelineStats) -> Result<()> {
        if plan.prices {
            let records = self
                .source
                .fetch_prices(request)
                .await
                .context("price scrape failed")?;
            let records = normalize_prices(records);

            if records.is_empty() {
                info!("{} / {}: no prices", request.state, request.commodity);
            } else {
                let written = self.sink.write_prices(request, &records).context("writing prices")?;
                info!("{} / {}: {} prices written, {} duplicates", request.state, request.commodity, written.written, written.duplicates);
                stats.prices += written;
            }
        }

        if plan.prices && plan.arrivals {
            sleep(self.pacing.jittered(self.pacing.inter_pair)).await;
        }

        if plan.arrivals {
            let range = self
                .collect_arrivals(request)
                .await
                .context("arrival scrape failed")?;
            stats.days_skipped += range.skipped_days.len();

            let records = normalize_arrivals(&range.snapshots, &self.locations);
            if records.is_empty() {
                info!("{} / {}: no arrivals", request.state, request.commodity);
            } else {
                let written = self.sink.write_arrivals(request, &records).context("writing arrivals")?;
                info!("{} / {}: {} arrivals written, {} duplicates", request.state, request.commodity, written.written, written.duplicates);
                stats.arrivals += written;
            }
        }

        Ok(())
    }

    /// One arrivals snapshot per day of `request`'s range, oldest first.
    ///
    /// Each day gets a fresh session scoped to that day and is retried while
    /// its error is transient; a day still failing after that is skipped. An
    /// error no retry can fix ends the whole range.
    pub async fn collect_arrivals(&self, request: &ScrapeRequest) -> Result<ArrivalRange, ScrapeError> {
        let days = day_range(request.date_start, request.date_end);
        let mut range = ArrivalRange::default();

        for (i, day) in days.iter().enumerate() {
            if i > 0 {
                sleep(self.pacing.jittered(self.pacing.inter_day)).await;
            }

            let day_request = request.for_day(*day);
            match self.fetch_day_with_retry(&day_request).await {
                Ok(snapshot) => {
                    info!("{}: {} markets", day, snapshot.pairs.len());
                    range.snapshots.push(snapshot);
                }
                Err(e) if e.is_transient() => {
                    warn!("{} / {} on {}: giving up on day: {}", request.state, request.commodity, day, e);
                    range.skipped_days.push(*day);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(range)
    }

    async fn fetch_day_with_retry(&self, request: &ScrapeRequest) -> Result<ArrivalDaySnapshot, ScrapeError> {
        let strategy = FixedInterval::from_millis(self.pacing.retry_delay_ms)
            .take(self.pacing.max_retries as usize);

        RetryIf::start(
            strategy,
            || self.source.fetch_arrival_day(request),
            |e: &ScrapeError| {
                if e.is_transient() {
                    warn!("{} on {}: {}; retrying", request.state, request.date_start, e);
                    true
                } else {
                    false
                }
            },
        )
        .await
    }
}
