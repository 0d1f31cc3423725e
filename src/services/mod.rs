pub mod availability;
pub use availability::{AvailabilityCache, CacheSettings, RefreshReport};

pub mod ingest;
pub use ingest::{IngestError, IngestOutcome, IngestService, MovieOutcome};

pub mod reconciler;
pub use reconciler::{MergeSummary, SeasonReconciler};

pub mod scheduler;
pub use scheduler::{Refreshable, Scheduler};

pub mod scraper;
pub use scraper::{Harvest, PaginatedScraper, ScrapeError, ScrapeFailure, ScraperSettings};
