//! Per-platform availability snapshots and the title lookup over them.
//!
//! The in-memory map is a read-through cache over a [`SnapshotStore`]: a
//! platform is loaded from disk the first time it is asked for, and every
//! successful scrape is persisted before it replaces the in-memory copy.
//! Snapshots are swapped as whole `Arc`s, so readers see either the old or
//! the new one.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::db::{SnapshotStore, StoreError};
use crate::domain::{PlatformId, WorkType};
use crate::models::{CacheSnapshot, PlatformConfig};
use crate::platforms::PlatformRegistry;
use crate::services::scheduler::Refreshable;
use crate::services::scraper::{PaginatedScraper, ScrapeFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedPlatform {
    pub platform: PlatformId,
    pub works: usize,
    pub pages: u32,
    /// Kept from a scrape that broke off before its last page.
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPlatform {
    pub platform: PlatformId,
    pub error: String,
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub refreshed: Vec<RefreshedPlatform>,
    pub failed: Vec<FailedPlatform>,
    pub duration: Duration,
}

impl RefreshReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub platform_delay: Duration,
    pub keep_partial_results: bool,
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            platform_delay: Duration::from_millis(config.platform_delay_ms),
            keep_partial_results: config.keep_partial_results,
        }
    }
}

pub struct AvailabilityCache {
    registry: Arc<PlatformRegistry>,
    scraper: PaginatedScraper,
    store: Arc<dyn SnapshotStore>,
    settings: CacheSettings,
    /// `None` marks a platform that was looked up on disk and not found.
    snapshots: RwLock<HashMap<PlatformId, Option<Arc<CacheSnapshot>>>>,
    refresh_lock: Mutex<()>,
}

impl AvailabilityCache {
    #[must_use]
    pub fn new(
        registry: Arc<PlatformRegistry>,
        scraper: PaginatedScraper,
        store: Arc<dyn SnapshotStore>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            registry,
            scraper,
            store,
            settings,
            snapshots: RwLock::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    /// Current snapshot of a platform, loading it from storage on first use.
    pub async fn get(&self, platform: &PlatformId) -> Option<Arc<CacheSnapshot>> {
        if let Some(cached) = self.snapshots.read().await.get(platform) {
            return cached.clone();
        }

        let loaded = match self.store.load(platform).await {
            Ok(snapshot) => snapshot.map(Arc::new),
            Err(e) => {
                // Not remembered, so the next lookup tries the disk again.
                warn!(platform = %platform, error = %e, "Failed to load cached snapshot");
                return None;
            }
        };

        // A refresh may have replaced the platform while the file was read.
        self.snapshots
            .write()
            .await
            .entry(platform.clone())
            .or_insert(loaded)
            .clone()
    }

    /// What is in memory right now. Never touches storage, so a platform
    /// persisted by an earlier run reads as `None` until [`Self::get`] or
    /// [`Self::load`] brings it in.
    pub async fn snapshot(&self, platform: &PlatformId) -> Option<Arc<CacheSnapshot>> {
        self.snapshots.read().await.get(platform).cloned().flatten()
    }

    /// Swaps in a new in-memory snapshot without touching storage.
    pub async fn replace(&self, snapshot: CacheSnapshot) {
        let platform = snapshot.platform.clone();
        self.snapshots
            .write()
            .await
            .insert(platform, Some(Arc::new(snapshot)));
    }

    /// Writes the in-memory snapshot of a platform to storage.
    pub async fn persist(&self, platform: &PlatformId) -> Result<(), StoreError> {
        if let Some(snapshot) = self.snapshot(platform).await {
            self.store.save(&snapshot).await?;
        }
        Ok(())
    }

    /// Re-reads a platform from storage, replacing what is in memory.
    pub async fn load(
        &self,
        platform: &PlatformId,
    ) -> Result<Option<Arc<CacheSnapshot>>, StoreError> {
        let loaded = self.store.load(platform).await?.map(Arc::new);
        self.snapshots
            .write()
            .await
            .insert(platform.clone(), loaded.clone());
        Ok(loaded)
    }

    /// Refreshes every registered platform.
    pub async fn refresh(&self) -> RefreshReport {
        let platforms: Vec<PlatformConfig> = self.registry.iter().cloned().collect();
        self.refresh_platforms(&platforms).await
    }

    /// Scrapes the given platforms one after another.
    ///
    /// A failed platform keeps its previous snapshot and never stops the
    /// cycle. Cycles never overlap.
    pub async fn refresh_platforms(&self, platforms: &[PlatformConfig]) -> RefreshReport {
        let _cycle = self.refresh_lock.lock().await;
        let start = Instant::now();
        let mut report = RefreshReport::default();

        info!(platforms = platforms.len(), "Starting availability refresh");

        for (index, config) in platforms.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.settings.platform_delay).await;
            }

            match self.scraper.scrape_platform(config).await {
                Ok(harvest) => {
                    let works = harvest.entries.len();
                    self.commit(CacheSnapshot::new(harvest.platform, harvest.entries))
                        .await;
                    report.refreshed.push(RefreshedPlatform {
                        platform: config.id.clone(),
                        works,
                        pages: harvest.pages,
                        partial: false,
                    });
                }
                Err(failure) => self.handle_failure(failure, &mut report).await,
            }
        }

        report.duration = start.elapsed();
        metrics::counter!("dramawatch_refresh_cycles_total").increment(1);
        metrics::counter!("dramawatch_refresh_failures_total")
            .increment(u64::try_from(report.failed.len()).unwrap_or(u64::MAX));

        info!(
            refreshed = report.refreshed.len(),
            failed = report.failed.len(),
            duration_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
            "Availability refresh finished"
        );

        report
    }

    async fn handle_failure(&self, failure: ScrapeFailure, report: &mut RefreshReport) {
        let keep = self.settings.keep_partial_results
            && failure.pages_completed > 0
            && !failure.partial.is_empty();

        if keep {
            warn!(
                platform = %failure.platform,
                pages = failure.pages_completed,
                error = %failure.error,
                "Scrape broke off, keeping partial results"
            );
            let works = failure.partial.len();
            self.commit(CacheSnapshot::new(failure.platform.clone(), failure.partial))
                .await;
            report.refreshed.push(RefreshedPlatform {
                platform: failure.platform,
                works,
                pages: failure.pages_completed,
                partial: true,
            });
            return;
        }

        warn!(
            platform = %failure.platform,
            pages = failure.pages_completed,
            error = %failure.error,
            "Platform refresh failed, keeping previous snapshot"
        );
        report.failed.push(FailedPlatform {
            platform: failure.platform,
            error: failure.error.to_string(),
        });
    }

    /// Persists a fresh snapshot, then makes it visible.
    async fn commit(&self, snapshot: CacheSnapshot) {
        if let Err(e) = self.store.save(&snapshot).await {
            warn!(platform = %snapshot.platform, error = %e, "Failed to persist snapshot");
        }
        debug!(platform = %snapshot.platform, works = snapshot.len(), "Snapshot replaced");
        self.replace(snapshot).await;
    }

    /// Watch URLs for an exact title, keyed by platform base name.
    ///
    /// Only platforms listing `work_type` are consulted.
    pub async fn lookup(&self, title: &str, work_type: WorkType) -> BTreeMap<String, String> {
        let mut found = BTreeMap::new();

        for config in self.registry.for_work_type(work_type) {
            let Some(snapshot) = self.get(&config.id).await else {
                continue;
            };
            if let Some(url) = snapshot.url_for(title) {
                found.insert(config.base_name().to_string(), url.to_string());
            }
        }

        found
    }
}

#[async_trait]
impl Refreshable for AvailabilityCache {
    fn job_name(&self) -> &'static str {
        "refresh_availability"
    }

    async fn run_refresh(&self) -> anyhow::Result<()> {
        let report = self.refresh().await;
        if report.refreshed.is_empty() && !report.failed.is_empty() {
            anyhow::bail!("every platform failed to refresh");
        }
        Ok(())
    }
}
