#![allow(dead_code)]

use async_trait::async_trait;
use dramawatch::clients::browser::{BrowserError, HtmlBrowserLauncher, PageSource};
use dramawatch::config::FetcherConfig;
use dramawatch::db::JsonSnapshotStore;
use dramawatch::domain::{PlatformId, WorkType};
use dramawatch::models::PlatformConfig;
use dramawatch::platforms::PlatformRegistry;
use dramawatch::services::{AvailabilityCache, CacheSettings, PaginatedScraper, ScraperSettings};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory website: listing pages keyed by absolute URL.
#[derive(Default)]
pub struct Listings {
    pages: Mutex<HashMap<String, String>>,
}

impl Listings {
    pub fn set(&self, url: &str, html: String) {
        self.pages.lock().unwrap().insert(url.to_string(), html);
    }
}

#[async_trait]
impl PageSource for Listings {
    async fn fetch_page(&self, url: &str) -> Result<String, BrowserError> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::Navigation {
                url: url.to_string(),
                message: "HTTP 404".to_string(),
            })
    }
}

/// A listing page with `(title, href)` cards and an optional next-page link.
pub fn listing_page(items: &[(&str, &str)], next: Option<&str>) -> String {
    let cards: String = items
        .iter()
        .map(|(title, href)| {
            format!(r#"<div class="card"><h3 class="title"> {title} </h3><a class="watch" href="{href}">watch</a></div>"#)
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<a class="next" href="{href}">next</a>"#))
        .unwrap_or_default();
    format!("<html><body>{cards}{next}</body></html>")
}

pub fn host(name: &str) -> String {
    format!("{}.example.com", name.to_ascii_lowercase())
}

pub fn listing_url(name: &str, page: u32) -> String {
    format!("https://{}/list?page={page}", host(name))
}

pub fn platform(name: &str, work_type: WorkType) -> PlatformConfig {
    PlatformConfig {
        id: PlatformId::new(name, work_type),
        listing_url: listing_url(name, 1),
        title_selector: ".title".to_string(),
        link_selector: "a.watch".to_string(),
        link_attribute: "href".to_string(),
        url_prefix: format!("https://{}", host(name)),
        next_page_selector: "a.next".to_string(),
        requires_login: false,
    }
}

/// Fetcher settings with enough burst that catalog calls never queue.
pub fn unthrottled() -> FetcherConfig {
    FetcherConfig {
        limit_for_period: 100,
        limit_burst: 100,
        ..FetcherConfig::default()
    }
}

pub fn temp_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("dramawatch-{prefix}-{}", uuid::Uuid::new_v4()))
}

pub fn scraper(listings: &Arc<Listings>) -> PaginatedScraper {
    let source: Arc<dyn PageSource> = listings.clone();
    PaginatedScraper::new(
        Arc::new(HtmlBrowserLauncher::new(source)),
        ScraperSettings {
            page_load_timeout: Duration::from_secs(1),
            page_delay: Duration::ZERO,
            max_pages: 50,
            max_stale_retries: 3,
        },
    )
}

pub fn availability(
    platforms: Vec<PlatformConfig>,
    listings: &Arc<Listings>,
    cache_dir: &Path,
) -> AvailabilityCache {
    AvailabilityCache::new(
        Arc::new(PlatformRegistry::new(platforms).expect("valid registry")),
        scraper(listings),
        Arc::new(JsonSnapshotStore::new(cache_dir)),
        CacheSettings {
            platform_delay: Duration::ZERO,
            keep_partial_results: false,
        },
    )
}
