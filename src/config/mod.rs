use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Browser session and pacing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_browser_args")]
    pub browser_args: Vec<String>,

    /// Ceiling on the blocking wait for a required control to appear.
    #[serde(default = "default_element_timeout_secs")]
    pub element_timeout_secs: u64,

    #[serde(default = "default_dropdown_settle_ms")]
    pub dropdown_settle_ms: u64,

    #[serde(default = "default_date_settle_ms")]
    pub date_settle_ms: u64,

    #[serde(default = "default_page_settle_ms")]
    pub page_settle_ms: u64,

    #[serde(default = "default_expand_settle_ms")]
    pub expand_settle_ms: u64,

    #[serde(default = "default_inter_day_delay_ms")]
    pub inter_day_delay_ms: u64,

    #[serde(default = "default_inter_pair_delay_ms")]
    pub inter_pair_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_true")]
    pub run_migrations: bool,

    /// When false, records go to JSON files under `output_dir` instead.
    #[serde(default = "default_true")]
    pub write_to_db: bool,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Which {state} × {commodity} pairs to scrape, and which flows
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_states")]
    pub states: Vec<String>,

    #[serde(default = "default_commodities")]
    pub commodities: Vec<String>,

    #[serde(default = "default_true")]
    pub scrape_prices: bool,

    #[serde(default = "default_true")]
    pub scrape_arrivals: bool,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "http://agmarknet.gov.in/".to_string()
}
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}
fn default_browser_args() -> Vec<String> {
    ["--headless", "--no-sandbox", "--disable-gpu", "--window-size=1280x1696"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_element_timeout_secs() -> u64 {
    30
}
fn default_dropdown_settle_ms() -> u64 {
    3000
}
fn default_date_settle_ms() -> u64 {
    3000
}
fn default_page_settle_ms() -> u64 {
    5000
}
fn default_expand_settle_ms() -> u64 {
    1000
}
fn default_inter_day_delay_ms() -> u64 {
    3000
}
fn default_inter_pair_delay_ms() -> u64 {
    5000
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_delay_ms() -> u64 {
    2000
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/mandi.duckdb")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_true() -> bool {
    true
}
fn default_states() -> Vec<String> {
    ["Punjab", "Haryana", "Rajasthan", "Himachal Pradesh"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_commodities() -> Vec<String> {
    vec!["Kinnow".to_string()]
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            webdriver_url: default_webdriver_url(),
            browser_args: default_browser_args(),
            element_timeout_secs: default_element_timeout_secs(),
            dropdown_settle_ms: default_dropdown_settle_ms(),
            date_settle_ms: default_date_settle_ms(),
            page_settle_ms: default_page_settle_ms(),
            expand_settle_ms: default_expand_settle_ms(),
            inter_day_delay_ms: default_inter_day_delay_ms(),
            inter_pair_delay_ms: default_inter_pair_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            run_migrations: true,
            write_to_db: true,
            output_dir: default_output_dir(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            states: default_states(),
            commodities: default_commodities(),
            scrape_prices: true,
            scrape_arrivals: true,
        }
    }
}

// ── Settle timings ───────────────────────────────────────────────────────────

/// Fixed pauses that absorb the target page's asynchronous re-rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTimings {
    pub dropdown: Duration,
    pub date_entry: Duration,
    pub page_turn: Duration,
    pub expand: Duration,
}

impl SettleTimings {
    /// No pauses at all; for driving scripted sessions.
    pub fn none() -> Self {
        Self {
            dropdown: Duration::ZERO,
            date_entry: Duration::ZERO,
            page_turn: Duration::ZERO,
            expand: Duration::ZERO,
        }
    }
}

impl ScraperConfig {
    pub fn settle_timings(&self) -> SettleTimings {
        SettleTimings {
            dropdown: Duration::from_millis(self.dropdown_settle_ms),
            date_entry: Duration::from_millis(self.date_settle_ms),
            page_turn: Duration::from_millis(self.page_settle_ms),
            expand: Duration::from_millis(self.expand_settle_ms),
        }
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::Environment::with_prefix("MANDI")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("pipeline.states")
                    .with_list_parse_key("pipeline.commodities")
                    .with_list_parse_key("scraper.browser_args")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to assemble configuration sources")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        app_cfg.validate()?;
        Ok(app_cfg)
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.scraper.base_url)
            .with_context(|| format!("scraper.base_url {:?}", self.scraper.base_url))?;
        Url::parse(&self.scraper.webdriver_url)
            .with_context(|| format!("scraper.webdriver_url {:?}", self.scraper.webdriver_url))?;

        if self.scraper.element_timeout_secs == 0 {
            bail!("scraper.element_timeout_secs must be greater than zero");
        }
        if self.pipeline.states.is_empty() {
            bail!("pipeline.states is empty");
        }
        if self.pipeline.commodities.is_empty() {
            bail!("pipeline.commodities is empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.pipeline.commodities, vec!["Kinnow"]);
        assert_eq!(cfg.pipeline.states.len(), 4);
        assert!(cfg.storage.write_to_db);
    }

    #[test]
    fn test_rejects_bad_url_and_empty_lists() {
        let mut cfg = AppConfig::default();
        cfg.scraper.webdriver_url = "not a url".into();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.pipeline.states.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[pipeline]\nstates = [\"Punjab\"]\n[storage]\nwrite_to_db = false\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.pipeline.states, vec!["Punjab"]);
        assert_eq!(cfg.pipeline.commodities, vec!["Kinnow"]);
        assert!(!cfg.storage.write_to_db);
        assert_eq!(cfg.scraper.page_settle_ms, 5000);
    }

    #[test]
    fn test_settle_timings_from_millis() {
        let t = ScraperConfig::default().settle_timings();
        assert_eq!(t.expand, Duration::from_millis(1000));
        assert_eq!(t.page_turn, Duration::from_secs(5));
        assert_eq!(SettleTimings::none().dropdown, Duration::ZERO);
    }
}
