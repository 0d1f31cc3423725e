use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::PlatformId;

/// Everything one platform listing offered as of its last successful scrape.
///
/// Entries map the exact displayed title to an absolute watch URL. A sorted
/// map keeps serialization deterministic, so scraping an unchanged listing
/// twice produces byte-identical cache files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub platform: PlatformId,
    pub entries: BTreeMap<String, String>,
    pub refreshed_at: DateTime<Utc>,
}

impl CacheSnapshot {
    #[must_use]
    pub fn new(platform: PlatformId, entries: BTreeMap<String, String>) -> Self {
        Self {
            platform,
            entries,
            refreshed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn empty(platform: PlatformId) -> Self {
        Self::new(platform, BTreeMap::new())
    }

    #[must_use]
    pub fn url_for(&self, title: &str) -> Option<&str> {
        self.entries.get(title).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
