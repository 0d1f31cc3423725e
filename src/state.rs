use std::sync::Arc;

use crate::clients::browser::{BrowserLauncher, HtmlBrowserLauncher};
use crate::clients::webdriver::WebDriverLauncher;
use crate::clients::fetcher::ResilientFetcher;
use crate::clients::tmdb::CatalogClient;
use crate::config::{BrowserKind, Config};
use crate::db::{
    JsonMovieRepository, JsonSeasonRepository, JsonSnapshotStore, MovieRepository, SeasonRepository,
};
use crate::platforms::PlatformRegistry;
use crate::services::{
    AvailabilityCache, CacheSettings, IngestService, PaginatedScraper, ScraperSettings,
};

/// Long-lived components wired from one [`Config`].
///
/// Cloning is cheap; every clone shares the fetcher's rate limit and the
/// in-memory availability snapshots.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub registry: Arc<PlatformRegistry>,

    pub catalog: Arc<CatalogClient>,

    pub availability: Arc<AvailabilityCache>,

    pub seasons: Arc<dyn SeasonRepository>,

    pub movies: Arc<dyn MovieRepository>,

    pub ingest: Arc<IngestService>,
}

impl AppState {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let registry = Arc::new(PlatformRegistry::from_config(&config.platforms)?);

        let fetcher = ResilientFetcher::new(&config.fetcher);
        let catalog = Arc::new(CatalogClient::new(fetcher, config.catalog.clone()));

        let launcher: Arc<dyn BrowserLauncher> = match config.scraper.browser {
            BrowserKind::WebDriver => Arc::new(WebDriverLauncher::new(&config.scraper)),
            BrowserKind::Static => Arc::new(HtmlBrowserLauncher::over_http(&config.scraper)),
        };
        let scraper = PaginatedScraper::new(launcher, ScraperSettings::from(&config.scraper));

        let availability = Arc::new(AvailabilityCache::new(
            Arc::clone(&registry),
            scraper,
            Arc::new(JsonSnapshotStore::new(&config.cache.directory)),
            CacheSettings::from(&config.cache),
        ));

        let seasons: Arc<dyn SeasonRepository> =
            Arc::new(JsonSeasonRepository::new(&config.general.seasons_path));

        let movies: Arc<dyn MovieRepository> =
            Arc::new(JsonMovieRepository::new(&config.general.movies_path));

        let ingest = Arc::new(IngestService::new(
            catalog.clone(),
            Arc::clone(&availability),
            Arc::clone(&seasons),
            Arc::clone(&movies),
        ));

        Ok(Self {
            config: Arc::new(config),
            registry,
            catalog,
            availability,
            seasons,
            movies,
            ingest,
        })
    }
}
