//! Catalog ingestion: fetch a work's seasons or a movie, annotate them with
//! where they can be watched, and merge them into stored state.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::clients::tmdb::{CatalogError, WorkCatalog};
use crate::db::{MovieRepository, SeasonRepository, StoreError};
use crate::domain::{SeasonNumber, WorkId, WorkType};
use crate::models::{MovieRecord, SeasonRecord, SeasonSet};
use crate::services::availability::AvailabilityCache;
use crate::services::reconciler::{MergeSummary, SeasonReconciler};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Work {0} not found in catalog")]
    NotFound(WorkId),

    #[error("Catalog error: {0}")]
    Catalog(CatalogError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Everything stored for the work after the merge.
    pub seasons: SeasonSet,
    pub summary: MergeSummary,
}

#[derive(Debug, Clone)]
pub struct MovieOutcome {
    pub movie: MovieRecord,
    /// False when an earlier ingest of the movie was updated.
    pub inserted: bool,
}

pub struct IngestService {
    catalog: Arc<dyn WorkCatalog>,
    availability: Arc<AvailabilityCache>,
    repository: Arc<dyn SeasonRepository>,
    movies: Arc<dyn MovieRepository>,
}

impl IngestService {
    pub fn new(
        catalog: Arc<dyn WorkCatalog>,
        availability: Arc<AvailabilityCache>,
        repository: Arc<dyn SeasonRepository>,
        movies: Arc<dyn MovieRepository>,
    ) -> Self {
        Self {
            catalog,
            availability,
            repository,
            movies,
        }
    }

    /// Fetches, annotates and stores every season of a work.
    ///
    /// With `actor_filter`, only seasons featuring that actor are fetched;
    /// seasons stored earlier are kept either way.
    ///
    /// # Errors
    ///
    /// - Returns [`IngestError::NotFound`] if the catalog has no such work
    /// - Returns [`IngestError::Catalog`] on rate limiting or exhausted retries
    /// - Returns [`IngestError::Store`] if stored seasons cannot be read or written
    pub async fn ingest(
        &self,
        work_id: WorkId,
        actor_filter: Option<&str>,
    ) -> Result<IngestOutcome, IngestError> {
        let records = self
            .catalog
            .season_records(work_id, actor_filter)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    IngestError::NotFound(work_id)
                } else {
                    IngestError::Catalog(e)
                }
            })?;

        let mut incoming = Vec::with_capacity(records.len());
        for record in records {
            incoming.push(self.annotate(work_id, record).await);
        }

        let existing = self.repository.load(work_id).await?;
        let (merged, summary) =
            SeasonReconciler::merge_with_summary(existing, SeasonSet::from_records(incoming));
        self.repository.save(work_id, &merged).await?;

        info!(
            work_id = %work_id,
            updated = summary.updated.len(),
            inserted = summary.inserted.len(),
            retained = summary.retained.len(),
            "Ingested work"
        );

        Ok(IngestOutcome {
            seasons: merged,
            summary,
        })
    }

    /// Fetches a movie, annotates it and stores it over any earlier ingest.
    ///
    /// # Errors
    ///
    /// - Returns [`IngestError::NotFound`] if the catalog has no such movie
    ///   or it comes from another country
    /// - Returns [`IngestError::Catalog`] on rate limiting or exhausted retries
    /// - Returns [`IngestError::Store`] if the movie cannot be read or written
    pub async fn ingest_movie(&self, work_id: WorkId) -> Result<MovieOutcome, IngestError> {
        let mut record = self.catalog.movie_record(work_id).await.map_err(|e| {
            if e.is_not_found() {
                IngestError::NotFound(work_id)
            } else {
                IngestError::Catalog(e)
            }
        })?;

        record.platforms = self
            .platforms(WorkType::Movie, work_id, SeasonNumber::new(1), &record.name)
            .await;
        record.last_updated = Some(Utc::now());

        let (movie, inserted) = match self.movies.load(work_id).await? {
            Some(mut stored) => {
                stored.update_from(record);
                (stored, false)
            }
            None => (record, true),
        };
        self.movies.save(&movie).await?;

        info!(
            work_id = %work_id,
            title = %movie.name,
            platforms = movie.platforms.len(),
            inserted,
            "Ingested movie"
        );

        Ok(MovieOutcome { movie, inserted })
    }

    async fn annotate(&self, work_id: WorkId, mut record: SeasonRecord) -> SeasonRecord {
        record.platforms = self
            .platforms(WorkType::Drama, work_id, record.season_number, &record.name)
            .await;
        record.last_updated = Some(Utc::now());
        record
    }

    /// Scraped platforms listing `name`, plus international providers.
    async fn platforms(
        &self,
        work_type: WorkType,
        work_id: WorkId,
        season: SeasonNumber,
        name: &str,
    ) -> BTreeMap<String, String> {
        let mut platforms = self.availability.lookup(name, work_type).await;

        // Provider data only adds platforms; scraped links take precedence.
        match self
            .catalog
            .international_platforms(work_type, work_id, season)
            .await
        {
            Ok(international) => {
                for (name, url) in international {
                    platforms.entry(name).or_insert(url);
                }
            }
            Err(e) => {
                warn!(work_id = %work_id, season = %season, error = %e, "Watch providers unavailable");
            }
        }

        platforms
    }
}
