//! Per-platform availability snapshots on disk.
//!
//! Each platform gets `<directory>/<platform id>.json` holding a pretty-printed
//! title to watch-URL object with keys in sorted order. The refresh time is the
//! file's modification time, so an unchanged listing rewrites identical bytes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{StoreError, file_stem, write_atomic};
use crate::domain::PlatformId;
use crate::models::CacheSnapshot;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// The persisted snapshot, or `None` when the platform was never saved.
    async fn load(&self, platform: &PlatformId) -> Result<Option<CacheSnapshot>, StoreError>;

    async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    directory: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub fn path_for(&self, platform: &PlatformId) -> PathBuf {
        self.directory
            .join(format!("{}.json", file_stem(&platform.to_string())))
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn load(&self, platform: &PlatformId) -> Result<Option<CacheSnapshot>, StoreError> {
        let path = self.path_for(platform);

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let entries: BTreeMap<String, String> =
            serde_json::from_slice(&content).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;

        let refreshed_at = tokio::fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);

        Ok(Some(CacheSnapshot {
            platform: platform.clone(),
            entries,
            refreshed_at,
        }))
    }

    async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), StoreError> {
        let path = self.path_for(&snapshot.platform);
        let content =
            serde_json::to_vec_pretty(&snapshot.entries).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;

        write_atomic(&path, &content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WorkType;

    fn temp_store() -> JsonSnapshotStore {
        JsonSnapshotStore::new(
            std::env::temp_dir().join(format!("dramawatch-snapshots-{}", uuid::Uuid::new_v4())),
        )
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let store = temp_store();
        let platform = PlatformId::new("MyVideo", WorkType::Movie);
        assert!(store.load(&platform).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_snapshot_loads_back() {
        let store = temp_store();
        let platform = PlatformId::new("LINE TV", WorkType::Drama);
        let entries: BTreeMap<String, String> =
            [("淚之女王".to_string(), "https://www.linetv.tw/drama/1".to_string())].into();

        store
            .save(&CacheSnapshot::new(platform.clone(), entries.clone()))
            .await
            .unwrap();

        assert!(store.path_for(&platform).ends_with("LINE TV-drama.json"));
        let loaded = store.load(&platform).await.unwrap().unwrap();
        assert_eq!(loaded.entries, entries);

        let _ = std::fs::remove_dir_all(store.directory());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let store = temp_store();
        let platform = PlatformId::new("LINE TV", WorkType::Drama);
        std::fs::create_dir_all(store.directory()).unwrap();
        std::fs::write(store.path_for(&platform), "not json").unwrap();

        let err = store.load(&platform).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));

        let _ = std::fs::remove_dir_all(store.directory());
    }
}
