//! Client for a TMDB-compatible media catalog.
//!
//! All requests go through the shared [`ResilientFetcher`], so they are rate
//! limited and retried, and "not found" arrives as a distinct error.

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info};

use crate::clients::fetcher::{FetchError, ResilientFetcher};
use crate::config::CatalogConfig;
use crate::constants::catalog::{DIRECTOR_JOBS, INTERNATIONAL_PLATFORMS, WRITER_JOBS};
use crate::domain::{SeasonNumber, WorkId, WorkType};
use crate::models::{DramaStatus, MovieRecord, ReleaseSchedule, SeasonRecord};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Not found in catalog: {0}")]
    NotFound(String),

    #[error("Catalog rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Catalog rejected the request with HTTP {status}")]
    Rejected { status: u16 },

    #[error("Unexpected catalog response: {0}")]
    Invalid(String),
}

impl CatalogError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<FetchError> for CatalogError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound { url } => Self::NotFound(url),
            FetchError::RateLimited { .. } => Self::RateLimited(err.to_string()),
            FetchError::RetriesExhausted { .. } => Self::Unavailable(err.to_string()),
            FetchError::Status { status, .. } => Self::Rejected { status },
            FetchError::Decode { .. } => Self::Invalid(err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogWork {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub origin_country: Vec<String>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub networks: Vec<Network>,
    #[serde(default)]
    pub seasons: Vec<SeasonSummary>,
    pub next_episode_to_air: Option<NextEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    pub name: String,
    #[serde(default)]
    pub origin_country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonSummary {
    pub season_number: u32,
    pub air_date: Option<String>,
    pub episode_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextEpisode {
    pub episode_number: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSeason {
    pub season_number: u32,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Episode {
    pub episode_number: u32,
    pub air_date: Option<String>,
    pub runtime: Option<u32>,
}

impl Episode {
    fn aired_on(&self) -> Option<NaiveDate> {
        self.air_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastMember {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrewMember {
    pub name: String,
    #[serde(default)]
    pub job: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentRatings {
    #[serde(default)]
    pub results: Vec<ContentRating>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentRating {
    pub iso_3166_1: String,
    #[serde(default)]
    pub rating: String,
}

impl ContentRatings {
    #[must_use]
    pub fn rating_for(&self, country: &str) -> Option<String> {
        self.results
            .iter()
            .find(|r| r.iso_3166_1 == country && !r.rating.trim().is_empty())
            .map(|r| r.rating.trim().to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogMovie {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub origin_country: Vec<String>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub runtime: Option<u32>,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseDates {
    #[serde(default)]
    pub results: Vec<CountryReleases>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryReleases {
    pub iso_3166_1: String,
    #[serde(default)]
    pub release_dates: Vec<ReleaseDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseDate {
    #[serde(default)]
    pub certification: String,
}

impl ReleaseDates {
    /// First non-empty certification listed for `country`.
    #[must_use]
    pub fn certification_for(&self, country: &str) -> Option<String> {
        self.results
            .iter()
            .filter(|r| r.iso_3166_1 == country)
            .flat_map(|r| &r.release_dates)
            .map(|d| d.certification.trim())
            .find(|c| !c.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct WatchProviderResponse {
    #[serde(default)]
    results: HashMap<String, RegionProviders>,
}

#[derive(Debug, Default, Deserialize)]
struct RegionProviders {
    #[serde(default)]
    flatrate: Vec<Provider>,
    #[serde(default)]
    rent: Vec<Provider>,
}

#[derive(Debug, Deserialize)]
struct Provider {
    provider_name: String,
}

/// Source of season and movie records, the seam the ingestion flow is
/// tested through.
#[async_trait]
pub trait WorkCatalog: Send + Sync {
    /// Every valid season of a work, optionally only those featuring an actor.
    async fn season_records(
        &self,
        id: WorkId,
        actor_filter: Option<&str>,
    ) -> Result<Vec<SeasonRecord>, CatalogError>;

    /// A movie from the configured origin country.
    async fn movie_record(&self, id: WorkId) -> Result<MovieRecord, CatalogError>;

    /// International providers carrying a work, keyed by platform name.
    async fn international_platforms(
        &self,
        work_type: WorkType,
        id: WorkId,
        season: SeasonNumber,
    ) -> Result<BTreeMap<String, String>, CatalogError>;
}

#[derive(Clone)]
pub struct CatalogClient {
    fetcher: ResilientFetcher,
    config: CatalogConfig,
}

struct WorkContext {
    work: CatalogWork,
    candidates: Vec<SeasonNumber>,
    english_name: Option<String>,
    age_rating: Option<String>,
}

/// Everything the catalog says about one season.
struct SeasonSources<'a> {
    work: &'a CatalogWork,
    english_name: Option<&'a str>,
    age_rating: Option<&'a str>,
    season: &'a CatalogSeason,
    credits: &'a Credits,
    multi_season: bool,
}

impl CatalogClient {
    #[must_use]
    pub const fn new(fetcher: ResilientFetcher, config: CatalogConfig) -> Self {
        Self { fetcher, config }
    }

    fn url(&self, path: &str, language: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}?api_key={}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/'),
            urlencoding::encode(&self.config.api_key)
        );
        if let Some(language) = language {
            url.push_str("&language=");
            url.push_str(&urlencoding::encode(language));
        }
        url
    }

    /// Id of the first search hit for a drama name.
    pub async fn search_work(&self, name: &str) -> Result<Option<WorkId>, CatalogError> {
        let mut url = self.url("search/tv", Some(&self.config.language));
        url.push_str("&query=");
        url.push_str(&urlencoding::encode(name));

        let response: SearchResponse = self.fetcher.fetch_json(&url).await?;
        Ok(response.results.first().map(|hit| WorkId::new(hit.id)))
    }

    /// Id of the first search hit for a movie title.
    pub async fn search_movie(&self, title: &str) -> Result<Option<WorkId>, CatalogError> {
        let mut url = self.url("search/movie", Some(&self.config.language));
        url.push_str("&query=");
        url.push_str(&urlencoding::encode(title));

        let response: SearchResponse = self.fetcher.fetch_json(&url).await?;
        Ok(response.results.first().map(|hit| WorkId::new(hit.id)))
    }

    pub async fn fetch_movie(&self, id: WorkId, language: &str) -> Result<CatalogMovie, CatalogError> {
        let url = self.url(&format!("movie/{id}"), Some(language));
        Ok(self.fetcher.fetch_json(&url).await?)
    }

    pub async fn fetch_movie_credits(&self, id: WorkId) -> Result<Credits, CatalogError> {
        let url = self.url(&format!("movie/{id}/credits"), Some(&self.config.language));
        Ok(self.fetcher.fetch_json(&url).await?)
    }

    pub async fn fetch_release_dates(&self, id: WorkId) -> Result<ReleaseDates, CatalogError> {
        let url = self.url(&format!("movie/{id}/release_dates"), None);
        Ok(self.fetcher.fetch_json(&url).await?)
    }

    /// A movie as a record, without platform annotations.
    ///
    /// Movies from other countries than the configured origin are reported
    /// as not found.
    pub async fn fetch_movie_record(&self, id: WorkId) -> Result<MovieRecord, CatalogError> {
        let movie = self.fetch_movie(id, &self.config.language).await?;
        if !movie.origin_country.iter().any(|c| *c == self.config.origin_country) {
            debug!(work_id = %id, origin = ?movie.origin_country, "Movie from another country");
            return Err(CatalogError::NotFound(format!("movie/{id}")));
        }

        let english_name = if self.config.secondary_language.is_empty() {
            None
        } else {
            Some(self.fetch_movie(id, &self.config.secondary_language).await?.title)
        };

        let age_rating = match self.fetch_release_dates(id).await {
            Ok(dates) => dates.certification_for(&self.config.origin_country),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let credits = self.fetch_movie_credits(id).await?;
        let (lead_actors, directors, writers) = crew_names(&credits, self.config.lead_cast_limit);

        let mut record = MovieRecord::new(id, movie.title);
        record.original_name = movie.original_title;
        record.english_name = english_name.filter(|n| !n.is_empty());
        record.runtime = movie.runtime.filter(|r| *r > 0);
        record.release_date = movie
            .release_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        record.age_rating = age_rating;
        record.genres = movie.genres.into_iter().map(|g| g.name).collect();
        record.lead_actors = lead_actors;
        record.directors = directors;
        record.writers = writers;
        record.poster_url = movie
            .poster_path
            .map(|path| format!("{}{path}", self.config.image_base_url));
        record.intro_page_url = Some(format!(
            "{}/{id}",
            self.config.movie_info_page_base_url.trim_end_matches('/')
        ));
        record.last_updated = Some(Utc::now());

        info!(work_id = %id, title = %record.name, "Fetched movie record");
        Ok(record)
    }

    pub async fn fetch_work(&self, id: WorkId, language: &str) -> Result<CatalogWork, CatalogError> {
        let url = self.url(&format!("tv/{id}"), Some(language));
        Ok(self.fetcher.fetch_json(&url).await?)
    }

    pub async fn fetch_season(
        &self,
        id: WorkId,
        season: SeasonNumber,
    ) -> Result<CatalogSeason, CatalogError> {
        let url = self.url(&format!("tv/{id}/season/{season}"), Some(&self.config.language));
        Ok(self.fetcher.fetch_json(&url).await?)
    }

    pub async fn fetch_credits(&self, id: WorkId, season: SeasonNumber) -> Result<Credits, CatalogError> {
        let url = self.url(
            &format!("tv/{id}/season/{season}/credits"),
            Some(&self.config.language),
        );
        Ok(self.fetcher.fetch_json(&url).await?)
    }

    pub async fn fetch_content_ratings(&self, id: WorkId) -> Result<ContentRatings, CatalogError> {
        let url = self.url(&format!("tv/{id}/content_ratings"), None);
        Ok(self.fetcher.fetch_json(&url).await?)
    }

    /// Providers in the configured watch region that map to a known platform.
    ///
    /// Dramas report subscription (`flatrate`) offers, movies report rentals.
    pub async fn fetch_watch_providers(
        &self,
        work_type: WorkType,
        id: WorkId,
        season: SeasonNumber,
    ) -> Result<BTreeMap<String, String>, CatalogError> {
        let path = match work_type {
            WorkType::Drama if season.is_sequel() => format!("tv/{id}/season/{season}/watch/providers"),
            WorkType::Drama => format!("tv/{id}/watch/providers"),
            WorkType::Movie => format!("movie/{id}/watch/providers"),
        };
        let url = self.url(&path, Some(&self.config.language));

        let mut response: WatchProviderResponse = self.fetcher.fetch_json(&url).await?;
        let Some(region) = response.results.remove(&self.config.watch_region) else {
            return Ok(BTreeMap::new());
        };

        let offers = match work_type {
            WorkType::Drama => region.flatrate,
            WorkType::Movie => region.rent,
        };

        Ok(offers
            .iter()
            .filter_map(|p| international_platform_url(&p.provider_name))
            .map(|(name, url)| (name.to_string(), url.to_string()))
            .collect())
    }

    /// Work-level data shared by every season of a work.
    async fn work_context(&self, id: WorkId) -> Result<WorkContext, CatalogError> {
        let work = self.fetch_work(id, &self.config.language).await?;
        let candidates = candidate_seasons(&work, &self.config.origin_country);
        if candidates.is_empty() {
            return Ok(WorkContext {
                work,
                candidates,
                english_name: None,
                age_rating: None,
            });
        }

        let english_name = if self.config.secondary_language.is_empty() {
            None
        } else {
            Some(self.fetch_work(id, &self.config.secondary_language).await?.name)
        };

        let age_rating = match self.fetch_content_ratings(id).await {
            Ok(ratings) => ratings.rating_for(&self.config.origin_country),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        Ok(WorkContext {
            work,
            candidates,
            english_name,
            age_rating,
        })
    }

    async fn season_record(
        &self,
        context: &WorkContext,
        number: SeasonNumber,
        today: NaiveDate,
    ) -> Result<SeasonRecord, CatalogError> {
        let id = WorkId::new(context.work.id);
        let season = self.fetch_season(id, number).await?;
        let credits = self.fetch_credits(id, number).await?;

        Ok(self.assemble(
            &SeasonSources {
                work: &context.work,
                english_name: context.english_name.as_deref(),
                age_rating: context.age_rating.as_deref(),
                season: &season,
                credits: &credits,
                multi_season: context.candidates.len() > 1,
            },
            number,
            today,
        ))
    }

    /// One season of a work as a record.
    ///
    /// Seasons that are not valid candidates (specials, undated, foreign
    /// works) are reported as not found.
    pub async fn fetch_season_record(
        &self,
        id: WorkId,
        number: SeasonNumber,
    ) -> Result<SeasonRecord, CatalogError> {
        let context = self.work_context(id).await?;
        if !context.candidates.contains(&number) {
            return Err(CatalogError::NotFound(format!("tv/{id}/season/{number}")));
        }

        self.season_record(&context, number, Local::now().date_naive())
            .await
    }

    /// Builds a record for every valid season of a work.
    ///
    /// Seasons the catalog cannot resolve are dropped, as are seasons whose
    /// lead cast lacks `actor_filter` when one is given.
    pub async fn fetch_season_records(
        &self,
        id: WorkId,
        actor_filter: Option<&str>,
    ) -> Result<Vec<SeasonRecord>, CatalogError> {
        let context = self.work_context(id).await?;
        if context.candidates.is_empty() {
            debug!(work_id = %id, "No valid seasons");
            return Ok(Vec::new());
        }

        let today = Local::now().date_naive();
        let mut records = Vec::with_capacity(context.candidates.len());

        for &number in &context.candidates {
            let record = match self.season_record(&context, number, today).await {
                Ok(record) => record,
                Err(e) if e.is_not_found() => {
                    debug!(work_id = %id, season = %number, "Season not in catalog, dropping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(actor) = actor_filter
                && !record.lead_actors.iter().any(|a| a == actor)
            {
                debug!(work_id = %id, season = %number, actor, "Actor not in lead cast, dropping");
                continue;
            }

            records.push(record);
        }

        info!(work_id = %id, seasons = records.len(), "Fetched season records");
        Ok(records)
    }

    fn assemble(&self, sources: &SeasonSources<'_>, number: SeasonNumber, today: NaiveDate) -> SeasonRecord {
        let work = sources.work;
        let episodes = &sources.season.episodes;
        let air_dates: Vec<NaiveDate> = episodes.iter().filter_map(Episode::aired_on).collect();

        let mut record = SeasonRecord::new(
            WorkId::new(work.id),
            number,
            season_name(&work.name, number),
        );
        record.original_name = season_name(&work.original_name, number);
        record.english_name = sources
            .english_name
            .filter(|n| !n.is_empty())
            .map(|n| english_season_name(n, number));

        record.episode_count = Some(u32::try_from(episodes.len()).unwrap_or(u32::MAX))
            .filter(|count| *count > 0)
            .or_else(|| {
                work.seasons
                    .iter()
                    .find(|s| s.season_number == number.value())
                    .and_then(|s| s.episode_count)
            });
        record.aired_episodes = Some(aired_count(&air_dates, today));
        record.runtime_per_episode = runtime_range(episodes.iter().filter_map(|e| e.runtime));
        record.release_year = release_year(
            episodes.first().and_then(Episode::aired_on),
            episodes.last().and_then(Episode::aired_on),
        );
        record.status = Some(drama_status(work.next_episode_to_air.as_ref()));
        record.release_schedule = ReleaseSchedule::classify(&air_dates);
        record.age_rating = sources.age_rating.map(str::to_string);

        record.genres = work.genres.iter().map(|g| g.name.clone()).collect();
        record.networks = work
            .networks
            .iter()
            .filter(|n| n.origin_country == self.config.origin_country)
            .map(|n| n.name.clone())
            .collect();

        let (lead_actors, directors, writers) = crew_names(sources.credits, self.config.lead_cast_limit);
        record.lead_actors = lead_actors;
        record.directors = directors;
        record.writers = writers;

        let poster = if sources.multi_season {
            sources.season.poster_path.as_ref().or(work.poster_path.as_ref())
        } else {
            work.poster_path.as_ref()
        };
        record.poster_url = poster.map(|path| format!("{}{path}", self.config.image_base_url));
        record.intro_page_url = Some(format!(
            "{}/{}",
            self.config.info_page_base_url.trim_end_matches('/'),
            work.id
        ));
        record.last_updated = Some(Utc::now());

        record
    }
}

#[async_trait]
impl WorkCatalog for CatalogClient {
    async fn season_records(
        &self,
        id: WorkId,
        actor_filter: Option<&str>,
    ) -> Result<Vec<SeasonRecord>, CatalogError> {
        self.fetch_season_records(id, actor_filter).await
    }

    async fn movie_record(&self, id: WorkId) -> Result<MovieRecord, CatalogError> {
        self.fetch_movie_record(id).await
    }

    async fn international_platforms(
        &self,
        work_type: WorkType,
        id: WorkId,
        season: SeasonNumber,
    ) -> Result<BTreeMap<String, String>, CatalogError> {
        self.fetch_watch_providers(work_type, id, season).await
    }
}

/// Regular seasons that have aired or have a date, for works from `country`.
#[must_use]
pub fn candidate_seasons(work: &CatalogWork, country: &str) -> Vec<SeasonNumber> {
    if !work.origin_country.iter().any(|c| c == country) {
        return Vec::new();
    }

    work.seasons
        .iter()
        .filter(|s| s.season_number > 0)
        .filter(|s| s.air_date.as_deref().is_some_and(|d| !d.is_empty()))
        .map(|s| SeasonNumber::new(s.season_number))
        .collect()
}

#[must_use]
pub fn season_name(name: &str, season: SeasonNumber) -> String {
    if season.is_sequel() {
        format!("{name}{season}")
    } else {
        name.to_string()
    }
}

#[must_use]
pub fn english_season_name(name: &str, season: SeasonNumber) -> String {
    if season.is_sequel() {
        format!("{name} {season}")
    } else {
        name.to_string()
    }
}

/// Episodes whose air date is strictly before `today`.
#[must_use]
pub fn aired_count(air_dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let aired = air_dates.iter().filter(|d| **d < today).count();
    u32::try_from(aired).unwrap_or(u32::MAX)
}

/// `"60"` when every known runtime agrees, `"55-70"` otherwise.
#[must_use]
pub fn runtime_range(runtimes: impl IntoIterator<Item = u32>) -> Option<String> {
    let (min, max) = runtimes
        .into_iter()
        .fold(None, |acc: Option<(u32, u32)>, r| match acc {
            None => Some((r, r)),
            Some((lo, hi)) => Some((lo.min(r), hi.max(r))),
        })?;

    Some(if min == max {
        min.to_string()
    } else {
        format!("{min}-{max}")
    })
}

#[must_use]
pub fn release_year(first: Option<NaiveDate>, last: Option<NaiveDate>) -> Option<String> {
    let first = first?.year();
    match last.map(|d| d.year()) {
        Some(last) if last != first => Some(format!("{first}-{last}")),
        _ => Some(first.to_string()),
    }
}

#[must_use]
pub fn drama_status(next_episode: Option<&NextEpisode>) -> DramaStatus {
    match next_episode {
        None => DramaStatus::Completed,
        Some(next) if next.episode_number == 1 => DramaStatus::NotAired,
        Some(_) => DramaStatus::Ongoing,
    }
}

fn crew_names(credits: &Credits, lead_limit: usize) -> (Vec<String>, Vec<String>, Vec<String>) {
    let lead_actors = credits
        .cast
        .iter()
        .take(lead_limit)
        .map(|c| c.name.clone())
        .collect();

    let with_job = |jobs: &[&str]| {
        credits
            .crew
            .iter()
            .filter(|c| jobs.contains(&c.job.as_str()))
            .map(|c| c.name.clone())
            .collect::<Vec<_>>()
    };

    (lead_actors, with_job(DIRECTOR_JOBS), with_job(WRITER_JOBS))
}

fn international_platform_url(provider: &str) -> Option<(&'static str, &'static str)> {
    INTERNATIONAL_PLATFORMS
        .iter()
        .find(|(name, _)| *name == provider)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::fetcher::{Transport, TransportError, TransportResponse};
    use crate::config::FetcherConfig;
    use std::sync::Arc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Serves canned bodies by URL path; anything else is a catalog 404.
    struct Routes(Vec<(&'static str, &'static str)>);

    #[async_trait]
    impl Transport for Routes {
        async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
            let parsed = url::Url::parse(url).map_err(|e| TransportError(e.to_string()))?;
            let language = parsed
                .query_pairs()
                .find(|(k, _)| k == "language")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            let key = format!("{}?{language}", parsed.path());

            let body = self
                .0
                .iter()
                .find(|(route, _)| *route == key || *route == parsed.path())
                .map(|(_, body)| *body);

            Ok(match body {
                Some(body) => TransportResponse {
                    status: 200,
                    body: body.to_string(),
                },
                None => TransportResponse {
                    status: 404,
                    body: r#"{"status_code":34}"#.to_string(),
                },
            })
        }
    }

    fn client(routes: Vec<(&'static str, &'static str)>) -> CatalogClient {
        let unthrottled = FetcherConfig {
            limit_for_period: 100,
            limit_burst: 100,
            ..FetcherConfig::default()
        };
        let fetcher = ResilientFetcher::with_transport(&unthrottled, Arc::new(Routes(routes)));
        let config = CatalogConfig {
            base_url: "https://catalog.example.com/3".to_string(),
            ..CatalogConfig::default()
        };
        CatalogClient::new(fetcher, config)
    }

    const WORK_ZH: &str = r#"{
        "id": 100,
        "name": "模範計程車",
        "original_name": "모범택시",
        "origin_country": ["KR"],
        "poster_path": "/work.jpg",
        "genres": [{"id": 1, "name": "犯罪"}],
        "networks": [{"name": "SBS", "origin_country": "KR"}, {"name": "Viu", "origin_country": "HK"}],
        "next_episode_to_air": null,
        "seasons": [
            {"season_number": 0, "air_date": "2021-01-01", "episode_count": 3},
            {"season_number": 1, "air_date": "2021-04-09", "episode_count": 2},
            {"season_number": 2, "air_date": "2023-02-17", "episode_count": 2},
            {"season_number": 3, "air_date": null, "episode_count": 0}
        ]
    }"#;

    const WORK_EN: &str = r#"{"id": 100, "name": "Taxi Driver", "original_name": "모범택시", "origin_country": ["KR"]}"#;

    const SEASON_1: &str = r#"{
        "season_number": 1,
        "poster_path": "/s1.jpg",
        "episodes": [
            {"episode_number": 1, "air_date": "2021-04-09", "runtime": 70},
            {"episode_number": 2, "air_date": "2021-04-10", "runtime": 65}
        ]
    }"#;

    const CREDITS_1: &str = r#"{
        "cast": [{"name": "李帝勳"}, {"name": "李諾雅"}],
        "crew": [{"name": "朴俊宇", "job": "Director"}, {"name": "吳尚浩", "job": "Writer"}, {"name": "someone", "job": "Editor"}]
    }"#;

    const RATINGS: &str = r#"{"results": [{"iso_3166_1": "US", "rating": "TV-MA"}, {"iso_3166_1": "KR", "rating": "19"}]}"#;

    #[test]
    fn sequel_names_carry_season_number() {
        assert_eq!(season_name("模範計程車", SeasonNumber::new(1)), "模範計程車");
        assert_eq!(season_name("模範計程車", SeasonNumber::new(2)), "模範計程車2");
        assert_eq!(english_season_name("Taxi Driver", SeasonNumber::new(2)), "Taxi Driver 2");
    }

    #[test]
    fn runtime_range_formats() {
        assert_eq!(runtime_range([60, 60]), Some("60".to_string()));
        assert_eq!(runtime_range([70, 60, 65]), Some("60-70".to_string()));
        assert_eq!(runtime_range(std::iter::empty()), None);
    }

    #[test]
    fn release_year_spans_new_year() {
        assert_eq!(
            release_year(Some(date("2024-12-20")), Some(date("2025-01-25"))),
            Some("2024-2025".to_string())
        );
        assert_eq!(release_year(Some(date("2024-03-01")), None), Some("2024".to_string()));
        assert_eq!(release_year(None, Some(date("2024-03-01"))), None);
    }

    #[test]
    fn aired_count_excludes_today() {
        let dates = [date("2024-01-01"), date("2024-01-02"), date("2024-01-03")];
        assert_eq!(aired_count(&dates, date("2024-01-03")), 2);
    }

    #[test]
    fn status_from_next_episode() {
        assert_eq!(drama_status(None), DramaStatus::Completed);
        assert_eq!(drama_status(Some(&NextEpisode { episode_number: 1 })), DramaStatus::NotAired);
        assert_eq!(drama_status(Some(&NextEpisode { episode_number: 5 })), DramaStatus::Ongoing);
    }

    #[test]
    fn candidates_require_origin_country_and_air_date() {
        let work: CatalogWork = serde_json::from_str(WORK_ZH).unwrap();
        assert_eq!(
            candidate_seasons(&work, "KR"),
            vec![SeasonNumber::new(1), SeasonNumber::new(2)]
        );
        assert!(candidate_seasons(&work, "JP").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_seasons_are_dropped() {
        // Season 2 has no season document, so only season 1 survives.
        let client = client(vec![
            ("/3/tv/100?zh-TW", WORK_ZH),
            ("/3/tv/100?en", WORK_EN),
            ("/3/tv/100/content_ratings", RATINGS),
            ("/3/tv/100/season/1", SEASON_1),
            ("/3/tv/100/season/1/credits", CREDITS_1),
        ]);

        let records = client.fetch_season_records(WorkId::new(100), None).await.unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.name, "模範計程車");
        assert_eq!(record.english_name.as_deref(), Some("Taxi Driver"));
        assert_eq!(record.episode_count, Some(2));
        assert_eq!(record.aired_episodes, Some(2));
        assert_eq!(record.runtime_per_episode.as_deref(), Some("65-70"));
        assert_eq!(record.release_year.as_deref(), Some("2021"));
        assert_eq!(record.release_schedule, ReleaseSchedule::FriSat);
        assert_eq!(record.status, Some(DramaStatus::Completed));
        assert_eq!(record.age_rating.as_deref(), Some("19"));
        assert_eq!(record.networks, vec!["SBS"]);
        assert_eq!(record.directors, vec!["朴俊宇"]);
        assert_eq!(record.writers, vec!["吳尚浩"]);
        assert_eq!(
            record.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/original/s1.jpg")
        );
        assert_eq!(
            record.intro_page_url.as_deref(),
            Some("https://www.themoviedb.org/tv/100")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn actor_filter_drops_other_seasons() {
        let client = client(vec![
            ("/3/tv/100?zh-TW", WORK_ZH),
            ("/3/tv/100?en", WORK_EN),
            ("/3/tv/100/content_ratings", RATINGS),
            ("/3/tv/100/season/1", SEASON_1),
            ("/3/tv/100/season/1/credits", CREDITS_1),
        ]);

        let kept = client
            .fetch_season_records(WorkId::new(100), Some("李帝勳"))
            .await
            .unwrap();
        assert_eq!(kept.len(), 1);

        let none = client
            .fetch_season_records(WorkId::new(100), Some("孔劉"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn single_season_requires_a_valid_candidate() {
        let client = client(vec![
            ("/3/tv/100?zh-TW", WORK_ZH),
            ("/3/tv/100?en", WORK_EN),
            ("/3/tv/100/content_ratings", RATINGS),
            ("/3/tv/100/season/1", SEASON_1),
            ("/3/tv/100/season/1/credits", CREDITS_1),
        ]);

        let record = client
            .fetch_season_record(WorkId::new(100), SeasonNumber::new(1))
            .await
            .unwrap();
        assert_eq!(record.lead_actors, vec!["李帝勳", "李諾雅"]);

        for specials_or_undated in [0, 3] {
            let err = client
                .fetch_season_record(WorkId::new(100), SeasonNumber::new(specials_or_undated))
                .await
                .unwrap_err();
            assert!(err.is_not_found());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_work_is_not_found() {
        let client = client(vec![]);
        let err = client.fetch_season_records(WorkId::new(1), None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn search_returns_first_hit() {
        let client = client(vec![("/3/search/tv", r#"{"results": [{"id": 7}, {"id": 8}]}"#)]);
        let id = client.search_work("淚之女王").await.unwrap();
        assert_eq!(id, Some(WorkId::new(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn watch_providers_map_known_platforms() {
        let body = r#"{"id": 100, "results": {
            "TW": {
                "flatrate": [{"provider_name": "Netflix"}, {"provider_name": "Unknown+"}],
                "rent": [{"provider_name": "Apple TV"}]
            },
            "US": {"flatrate": [{"provider_name": "Disney Plus"}]}
        }}"#;
        let client = client(vec![
            ("/3/tv/100/watch/providers", body),
            ("/3/movie/100/watch/providers", body),
        ]);

        let drama = client
            .fetch_watch_providers(WorkType::Drama, WorkId::new(100), SeasonNumber::new(1))
            .await
            .unwrap();
        assert_eq!(drama.len(), 1);
        assert_eq!(drama["Netflix"], "https://www.netflix.com");

        let movie = client
            .fetch_watch_providers(WorkType::Movie, WorkId::new(100), SeasonNumber::new(1))
            .await
            .unwrap();
        assert_eq!(movie.keys().collect::<Vec<_>>(), vec!["Apple TV"]);
    }

    const MOVIE_ZH: &str = r#"{
        "id": 496243,
        "title": "寄生上流",
        "original_title": "기생충",
        "origin_country": ["KR"],
        "poster_path": "/parasite.jpg",
        "genres": [{"id": 35, "name": "喜劇"}, {"id": 53, "name": "驚悚"}],
        "runtime": 132,
        "release_date": "2019-05-30"
    }"#;

    const MOVIE_EN: &str = r#"{"id": 496243, "title": "Parasite", "origin_country": ["KR"]}"#;

    const MOVIE_CREDITS: &str = r#"{
        "cast": [{"name": "宋康昊"}, {"name": "李善均"}],
        "crew": [{"name": "奉俊昊", "job": "Director"}, {"name": "奉俊昊", "job": "Writer"}, {"name": "韓珍元", "job": "Writer"}]
    }"#;

    const RELEASE_DATES: &str = r#"{"results": [
        {"iso_3166_1": "US", "release_dates": [{"certification": "R"}]},
        {"iso_3166_1": "KR", "release_dates": [{"certification": ""}, {"certification": "15"}]}
    ]}"#;

    #[tokio::test(start_paused = true)]
    async fn movie_record_is_assembled_from_movie_endpoints() {
        let client = client(vec![
            ("/3/movie/496243?zh-TW", MOVIE_ZH),
            ("/3/movie/496243?en", MOVIE_EN),
            ("/3/movie/496243/credits", MOVIE_CREDITS),
            ("/3/movie/496243/release_dates", RELEASE_DATES),
        ]);

        let movie = client.fetch_movie_record(WorkId::new(496_243)).await.unwrap();
        assert_eq!(movie.name, "寄生上流");
        assert_eq!(movie.original_name, "기생충");
        assert_eq!(movie.english_name.as_deref(), Some("Parasite"));
        assert_eq!(movie.runtime, Some(132));
        assert_eq!(movie.release_date, Some(date("2019-05-30")));
        assert_eq!(movie.age_rating.as_deref(), Some("15"));
        assert_eq!(movie.genres, vec!["喜劇", "驚悚"]);
        assert_eq!(movie.lead_actors, vec!["宋康昊", "李善均"]);
        assert_eq!(movie.directors, vec!["奉俊昊"]);
        assert_eq!(movie.writers, vec!["奉俊昊", "韓珍元"]);
        assert_eq!(
            movie.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/original/parasite.jpg")
        );
        assert_eq!(
            movie.intro_page_url.as_deref(),
            Some("https://www.themoviedb.org/movie/496243")
        );
        assert!(movie.platforms.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn movie_without_release_dates_has_no_rating() {
        let client = client(vec![
            ("/3/movie/496243?zh-TW", MOVIE_ZH),
            ("/3/movie/496243?en", MOVIE_EN),
            ("/3/movie/496243/credits", MOVIE_CREDITS),
        ]);

        let movie = client.fetch_movie_record(WorkId::new(496_243)).await.unwrap();
        assert_eq!(movie.age_rating, None);
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_movie_is_not_found() {
        let client = client(vec![(
            "/3/movie/9?zh-TW",
            r#"{"id": 9, "title": "外國片", "origin_country": ["US"]}"#,
        )]);

        let err = client.fetch_movie_record(WorkId::new(9)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn movie_search_uses_the_movie_index() {
        let client = client(vec![
            ("/3/search/movie", r#"{"results": [{"id": 496243}]}"#),
            ("/3/search/tv", r#"{"results": [{"id": 1}]}"#),
        ]);
        let id = client.search_movie("寄生上流").await.unwrap();
        assert_eq!(id, Some(WorkId::new(496_243)));
    }
}
