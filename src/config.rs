use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::constants;
use crate::models::PlatformConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub observability: ObservabilityConfig,

    pub fetcher: FetcherConfig,

    pub catalog: CatalogConfig,

    pub scraper: ScraperConfig,

    pub cache: CacheConfig,

    pub scheduler: SchedulerConfig,

    /// Replaces the built-in platform registry when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<PlatformConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Directory holding one JSON file per ingested work.
    pub seasons_path: String,

    /// Directory holding one JSON file per ingested movie.
    pub movies_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 2,
            seasons_path: "data/seasons".to_string(),
            movies_path: "data/movies".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    /// Prometheus scrape endpoint, only served in daemon mode.
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_port: 9184,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Requests allowed per refresh period, shared by every caller.
    pub limit_for_period: u32,

    pub limit_refresh_period_ms: u64,

    /// Permits that may be taken back to back after an idle spell. With 1,
    /// requests are spaced evenly across the refresh period.
    pub limit_burst: u32,

    /// How long a caller may wait for a permit before giving up.
    pub rate_limit_timeout_ms: u64,

    pub max_attempts: u32,

    pub backoff_base_ms: u64,

    pub backoff_multiplier: f64,

    pub backoff_max_ms: u64,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,

    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            limit_for_period: constants::fetcher::LIMIT_FOR_PERIOD,
            limit_refresh_period_ms: duration_ms(constants::fetcher::LIMIT_REFRESH_PERIOD),
            limit_burst: constants::fetcher::LIMIT_BURST,
            rate_limit_timeout_ms: duration_ms(constants::fetcher::RATE_LIMIT_TIMEOUT),
            max_attempts: constants::fetcher::MAX_ATTEMPTS,
            backoff_base_ms: duration_ms(constants::fetcher::BACKOFF_BASE),
            backoff_multiplier: constants::fetcher::BACKOFF_MULTIPLIER,
            backoff_max_ms: duration_ms(constants::fetcher::BACKOFF_MAX),
            request_timeout_seconds: 30,
            user_agent: format!("dramawatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,

    pub api_key: String,

    /// Language for names, genres and cast.
    pub language: String,

    /// Language used for the additional English name; empty disables it.
    pub secondary_language: String,

    /// Only works from this country count as valid seasons.
    pub origin_country: String,

    /// Region whose watch providers annotate a season.
    pub watch_region: String,

    pub image_base_url: String,

    pub info_page_base_url: String,

    pub movie_info_page_base_url: String,

    pub lead_cast_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_string(),
            api_key: String::new(),
            language: "zh-TW".to_string(),
            secondary_language: "en".to_string(),
            origin_country: "KR".to_string(),
            watch_region: "TW".to_string(),
            image_base_url: "https://image.tmdb.org/t/p/original".to_string(),
            info_page_base_url: "https://www.themoviedb.org/tv".to_string(),
            movie_info_page_base_url: "https://www.themoviedb.org/movie".to_string(),
            lead_cast_limit: constants::catalog::LEAD_CAST_LIMIT,
        }
    }
}

/// How listing pages are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// A real browser behind a WebDriver endpoint.
    #[default]
    WebDriver,
    /// Server-rendered HTML fetched over HTTP; no scripts, links only.
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub browser: BrowserKind,

    /// chromedriver or any other WebDriver server.
    pub webdriver_url: String,

    pub headless: bool,

    pub page_load_timeout_seconds: u64,

    /// Courtesy delay between pagination steps.
    pub page_delay_ms: u64,

    /// Safety bound for listings that never drop their "next" control.
    pub max_pages: u32,

    pub max_stale_retries: u32,

    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::default(),
            webdriver_url: constants::scraper::WEBDRIVER_URL.to_string(),
            headless: true,
            page_load_timeout_seconds: constants::scraper::PAGE_LOAD_TIMEOUT.as_secs(),
            page_delay_ms: duration_ms(constants::scraper::PAGE_DELAY),
            max_pages: constants::scraper::MAX_PAGES,
            max_stale_retries: constants::scraper::MAX_STALE_RETRIES,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub directory: String,

    /// Courtesy delay between platforms in a refresh cycle.
    pub platform_delay_ms: u64,

    /// Keep what a failed scrape collected before it broke off.
    pub keep_partial_results: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: constants::cache::DEFAULT_DIRECTORY.to_string(),
            platform_delay_ms: duration_ms(constants::cache::PLATFORM_DELAY),
            keep_partial_results: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    pub cron_expression: Option<String>,

    /// Used when no cron expression is set.
    pub refresh_interval_hours: u32,

    pub refresh_on_startup: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron_expression: Some("0 0 */3 * * *".to_string()),
            refresh_interval_hours: 3,
            refresh_on_startup: false,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("dramawatch").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".dramawatch").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetcher.limit_for_period == 0 {
            anyhow::bail!("fetcher.limit_for_period must be > 0");
        }

        if self.fetcher.limit_refresh_period_ms == 0 {
            anyhow::bail!("fetcher.limit_refresh_period_ms must be > 0");
        }

        if self.fetcher.limit_burst == 0 || self.fetcher.limit_burst > self.fetcher.limit_for_period {
            anyhow::bail!("fetcher.limit_burst must be between 1 and fetcher.limit_for_period");
        }

        if self.fetcher.max_attempts == 0 {
            anyhow::bail!("fetcher.max_attempts must be > 0");
        }

        if self.fetcher.backoff_multiplier < 1.0 {
            anyhow::bail!("fetcher.backoff_multiplier must be >= 1.0");
        }

        if self.scraper.browser == BrowserKind::WebDriver
            && url::Url::parse(&self.scraper.webdriver_url).is_err()
        {
            anyhow::bail!("scraper.webdriver_url must be a valid URL");
        }

        if self.scraper.max_pages == 0 {
            anyhow::bail!("scraper.max_pages must be > 0");
        }

        if self.cache.directory.trim().is_empty() {
            anyhow::bail!("cache.directory cannot be empty");
        }

        if self.scheduler.enabled
            && self.scheduler.refresh_interval_hours == 0
            && self.scheduler.cron_expression.is_none()
        {
            anyhow::bail!("Scheduler interval must be > 0 or cron expression must be set");
        }

        Ok(())
    }
}
