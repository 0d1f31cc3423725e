//! Storage of ingested movies, one file per catalog work.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::{StoreError, write_atomic};
use crate::domain::WorkId;
use crate::models::MovieRecord;

#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn load(&self, work_id: WorkId) -> Result<Option<MovieRecord>, StoreError>;

    async fn save(&self, movie: &MovieRecord) -> Result<(), StoreError>;
}

/// `<directory>/<work id>.json`
#[derive(Debug, Clone)]
pub struct JsonMovieRepository {
    directory: PathBuf,
}

impl JsonMovieRepository {
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
impl MovieRepository for JsonMovieRepository {
    async fn load(&self, work_id: WorkId) -> Result<Option<MovieRecord>, StoreError> {
        let path = self.path_for(work_id);

        match tokio::fs::read(&path).await {
            Ok(content) => serde_json::from_slice(&content)
                .map(Some)
                .map_err(|source| StoreError::Corrupt { path, source }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    async fn save(&self, movie: &MovieRecord) -> Result<(), StoreError> {
        let path = self.path_for(movie.work_id);
        let content = serde_json::to_vec_pretty(movie).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;

        write_atomic(&path, &content).await
    }
}

#[derive(Debug, Default)]
pub struct MemoryMovieRepository {
    movies: RwLock<HashMap<WorkId, MovieRecord>>,
}

impl MemoryMovieRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MovieRepository for MemoryMovieRepository {
    async fn load(&self, work_id: WorkId) -> Result<Option<MovieRecord>, StoreError> {
        Ok(self.movies.read().await.get(&work_id).cloned())
    }

    async fn save(&self, movie: &MovieRecord) -> Result<(), StoreError> {
        self.movies.write().await.insert(movie.work_id, movie.clone());
        Ok(())
    }
}
