mod browser;
mod config;
mod error;
mod etl;
mod loader;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::browser::webdriver::WebDriverLauncher;
use crate::browser::SessionLauncher;
use crate::config::AppConfig;
use crate::loader::load_locations;
use crate::pipeline::{Pacing, Pipeline, RunPlan};
use crate::scraper::MandiScraper;
use crate::storage::{JsonFileSink, RecordSink, Repository};

#[derive(Parser)]
#[command(name = "mandi-scraper", about = "Agmarknet mandi price and arrival scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape prices and arrivals for every configured state × commodity
    Run {
        /// First day, YYYY-MM-DD (default: yesterday)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day, YYYY-MM-DD (default: same as start)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Override configured states (repeatable)
        #[arg(long = "state")]
        states: Vec<String>,

        /// Override configured commodities (repeatable)
        #[arg(long = "commodity")]
        commodities: Vec<String>,

        /// Run a single flow
        #[arg(long, value_enum)]
        only: Option<Only>,

        /// Write JSON files instead of the database
        #[arg(long)]
        json: bool,
    },

    /// Import a state,district,market CSV into the location map
    LoadLocations {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show database statistics
    Stats,

    /// Apply schema migrations without scraping
    Migrate,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Only {
    Prices,
    Arrivals,
}

fn yesterday() -> Result<NaiveDate> {
    Local::now()
        .date_naive()
        .pred_opt()
        .context("no day before today")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "mandi_scraper=info,warn",
        1 => "mandi_scraper=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Run { start, end, states, commodities, only, json } => {
            let _t = utils::Timer::start("Scrape run");

            let start = match start {
                Some(d) => d,
                None => yesterday()?,
            };
            let end = end.unwrap_or(start);
            if start > end {
                bail!("--start {} is after --end {}", start, end);
            }

            let plan = RunPlan {
                states: if states.is_empty() { config.pipeline.states.clone() } else { states },
                commodities: if commodities.is_empty() { config.pipeline.commodities.clone() } else { commodities },
                start,
                end,
                prices: config.pipeline.scrape_prices && only != Some(Only::Arrivals),
                arrivals: config.pipeline.scrape_arrivals && only != Some(Only::Prices),
            };

            let repo = Repository::open(&config.storage.db_path)?;
            if config.storage.run_migrations {
                repo.run_migrations()?;
            }

            let locations = repo.load_location_map()?;
            if plan.arrivals && locations.is_empty() {
                warn!("Location map is empty; arrivals will carry no district (see `mandi-scraper load-locations`)");
            }

            let launcher: Arc<dyn SessionLauncher> = Arc::new(WebDriverLauncher::new(&config.scraper));
            let scraper = MandiScraper::new(launcher, &config.scraper);

            let use_db = config.storage.write_to_db && !json;
            let json_sink = JsonFileSink::new(config.storage.output_dir.clone());
            let sink: &dyn RecordSink = if use_db { &repo } else { &json_sink };

            let run_id = if use_db { Some(repo.begin_scrape_run()?) } else { None };

            let pipeline = Pipeline::new(&scraper, sink, locations, Pacing::from_config(&config.scraper));
            let stats = pipeline.run(&plan).await;

            if let Some(id) = run_id {
                let error = (stats.pairs_failed > 0).then(|| format!("{} pairs failed", stats.pairs_failed));
                repo.finish_scrape_run(id, stats.pairs_processed, stats.rows_written(), error.as_deref())?;
            }

            info!(
                "Done: {} pairs, {} rows written, {} failed",
                stats.pairs_processed,
                stats.rows_written(),
                stats.pairs_failed
            );
        }

        Command::LoadLocations { file } => {
            let repo = Repository::open(&config.storage.db_path)?;
            repo.run_migrations()?;

            let entries = load_locations(&file)?;
            let added = repo.upsert_locations(&entries)?;
            info!("Done: {} locations read, {} new", entries.len(), added);
        }

        Command::Stats => {
            let repo = Repository::open(&config.storage.db_path)?;
            let prices = repo.price_count()?;
            let arrivals = repo.arrival_count()?;
            let locations = repo.location_count()?;
            let (p_min, p_max) = repo.price_date_range().unwrap_or((None, None));
            let (a_min, a_max) = repo.arrival_date_range().unwrap_or((None, None));
            let show = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or("—".into());
            println!("─────────────────────────────────");
            println!("  Mandi Scraper — Database Stats");
            println!("─────────────────────────────────");
            println!("  Prices    : {}", utils::fmt_number(prices));
            println!("    From    : {}", show(p_min));
            println!("    To      : {}", show(p_max));
            println!("  Arrivals  : {}", utils::fmt_number(arrivals));
            println!("    From    : {}", show(a_min));
            println!("    To      : {}", show(a_max));
            println!("  Locations : {}", utils::fmt_number(locations));
            println!("─────────────────────────────────");
        }

        Command::Migrate => {
            Repository::open(&config.storage.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }
    }

    Ok(())
}
