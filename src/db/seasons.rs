//! Storage of reconciled season sets, one set per catalog work.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::{StoreError, write_atomic};
use crate::domain::WorkId;
use crate::models::SeasonSet;

#[async_trait]
pub trait SeasonRepository: Send + Sync {
    /// Stored seasons of a work; empty when nothing was stored yet.
    async fn load(&self, work_id: WorkId) -> Result<SeasonSet, StoreError>;

    async fn save(&self, work_id: WorkId, seasons: &SeasonSet) -> Result<(), StoreError>;
}

/// `<directory>/<work id>.json`, a list of season records.
#[derive(Debug, Clone)]
pub struct JsonSeasonRepository {
    directory: PathBuf,
}

impl JsonSeasonRepository {
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
    pub fn path_for(&self, work_id: WorkId) -> PathBuf {
        self.directory.join(format!("{work_id}.json"))
    }
}

#[async_trait]
impl SeasonRepository for JsonSeasonRepository {
    async fn load(&self, work_id: WorkId) -> Result<SeasonSet, StoreError> {
        let path = self.path_for(work_id);

        match tokio::fs::read(&path).await {
            Ok(content) => serde_json::from_slice(&content)
                .map_err(|source| StoreError::Corrupt { path, source }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SeasonSet::new()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    async fn save(&self, work_id: WorkId, seasons: &SeasonSet) -> Result<(), StoreError> {
        let path = self.path_for(work_id);
        let content = serde_json::to_vec_pretty(seasons).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;

        write_atomic(&path, &content).await
    }
}

#[derive(Debug, Default)]
pub struct MemorySeasonRepository {
    works: RwLock<HashMap<WorkId, SeasonSet>>,
}

impl MemorySeasonRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeasonRepository for MemorySeasonRepository {
    async fn load(&self, work_id: WorkId) -> Result<SeasonSet, StoreError> {
        Ok(self
            .works
            .read()
            .await
            .get(&work_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, work_id: WorkId, seasons: &SeasonSet) -> Result<(), StoreError> {
        self.works.write().await.insert(work_id, seasons.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeasonNumber;
    use crate::models::SeasonRecord;

    #[tokio::test]
    async fn json_repository_round_trips_a_work() {
        let repo = JsonSeasonRepository::new(
            std::env::temp_dir().join(format!("dramawatch-seasons-{}", uuid::Uuid::new_v4())),
        );
        let id = WorkId::new(42);
        assert!(repo.load(id).await.unwrap().is_empty());

        let set = SeasonSet::from_records(vec![
            SeasonRecord::new(id, SeasonNumber::new(1), "劇名"),
            SeasonRecord::new(id, SeasonNumber::new(2), "劇名2"),
        ]);
        repo.save(id, &set).await.unwrap();
        assert_eq!(repo.load(id).await.unwrap(), set);

        let _ = std::fs::remove_dir_all(repo.directory());
    }
}
