use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::domain::{SeasonKey, SeasonNumber, WorkId};

/// Airing state of a season, derived from the catalog's next scheduled episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DramaStatus {
    NotAired,
    Ongoing,
    Completed,
}

impl DramaStatus {
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::NotAired => "即將播出",
            Self::Ongoing => "跟播中",
            Self::Completed => "已完結",
        }
    }
}

/// Broadcast slot of a season in its origin country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseSchedule {
    MonTue,
    WedThu,
    FriSat,
    SatSun,
    FullRelease,
    #[default]
    Unknown,
    Others,
}

impl ReleaseSchedule {
    /// Classifies a season by the weekdays its episodes aired on.
    ///
    /// `air_dates` must be in episode order. A single date, or a first episode
    /// airing on the same day as the last, means the whole season dropped at
    /// once.
    #[must_use]
    pub fn classify(air_dates: &[NaiveDate]) -> Self {
        let (Some(first), Some(last)) = (air_dates.first(), air_dates.last()) else {
            return Self::Unknown;
        };

        if air_dates.len() == 1 || first == last {
            return Self::FullRelease;
        }

        let weekdays: HashSet<Weekday> = air_dates.iter().map(chrono::Datelike::weekday).collect();
        if weekdays.len() != 2 {
            return Self::Others;
        }

        let has = |a: Weekday, b: Weekday| weekdays.contains(&a) && weekdays.contains(&b);
        if has(Weekday::Mon, Weekday::Tue) {
            Self::MonTue
        } else if has(Weekday::Wed, Weekday::Thu) {
            Self::WedThu
        } else if has(Weekday::Fri, Weekday::Sat) {
            Self::FriSat
        } else if has(Weekday::Sat, Weekday::Sun) {
            Self::SatSun
        } else {
            Self::Others
        }
    }

    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::MonTue => "月火",
            Self::WedThu => "水木",
            Self::FriSat => "金土",
            Self::SatSun => "土日",
            Self::FullRelease => "公開日全集上架",
            Self::Unknown => "尚未公布播出日程",
            Self::Others => "其他",
        }
    }
}

/// One season of a catalog work, annotated with where it can be watched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub work_id: WorkId,
    pub season_number: SeasonNumber,

    /// Localized display name; sequels carry the season number.
    pub name: String,
    pub original_name: String,
    #[serde(default)]
    pub english_name: Option<String>,

    #[serde(default)]
    pub episode_count: Option<u32>,
    #[serde(default)]
    pub aired_episodes: Option<u32>,
    /// Per-episode runtime estimate in minutes, e.g. `"60"` or `"60-70"`.
    #[serde(default)]
    pub runtime_per_episode: Option<String>,
    /// `"2024"` or `"2024-2025"` for seasons spanning a new year.
    #[serde(default)]
    pub release_year: Option<String>,
    #[serde(default)]
    pub status: Option<DramaStatus>,
    #[serde(default)]
    pub release_schedule: ReleaseSchedule,
    #[serde(default)]
    pub age_rating: Option<String>,

    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub lead_actors: Vec<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub writers: Vec<String>,

    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub intro_page_url: Option<String>,
    /// Curated by hand; the catalog never provides it.
    #[serde(default)]
    pub trailer_url: Option<String>,

    /// Platform name to watch URL.
    #[serde(default)]
    pub platforms: BTreeMap<String, String>,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl SeasonRecord {
    #[must_use]
    pub fn new(work_id: WorkId, season_number: SeasonNumber, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            work_id,
            season_number,
            original_name: name.clone(),
            name,
            english_name: None,
            episode_count: None,
            aired_episodes: None,
            runtime_per_episode: None,
            release_year: None,
            status: None,
            release_schedule: ReleaseSchedule::Unknown,
            age_rating: None,
            genres: Vec::new(),
            networks: Vec::new(),
            lead_actors: Vec::new(),
            directors: Vec::new(),
            writers: Vec::new(),
            poster_url: None,
            intro_page_url: None,
            trailer_url: None,
            platforms: BTreeMap::new(),
            last_updated: None,
        }
    }

    #[must_use]
    pub const fn key(&self) -> SeasonKey {
        SeasonKey::new(self.work_id, self.season_number)
    }

    /// Overwrites every catalog-sourced field with the incoming values.
    ///
    /// The fingerprint never changes. A curated trailer survives when the
    /// incoming record has none.
    pub fn update_from(&mut self, incoming: Self) {
        let key = self.key();
        let trailer_url = incoming.trailer_url.clone().or_else(|| self.trailer_url.take());

        *self = incoming;
        self.work_id = key.work_id;
        self.season_number = key.season_number;
        self.trailer_url = trailer_url;
    }
}

/// Season records ordered by fingerprint, i.e. by season number within a work.
///
/// At most one record exists per (work id, season number).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SeasonRecord>", into = "Vec<SeasonRecord>")]
pub struct SeasonSet {
    seasons: BTreeMap<SeasonKey, SeasonRecord>,
}

impl SeasonSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from records; a later record replaces an earlier one with
    /// the same fingerprint.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = SeasonRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            set.upsert(record);
        }
        set
    }

    pub fn upsert(&mut self, record: SeasonRecord) -> Option<SeasonRecord> {
        self.seasons.insert(record.key(), record)
    }

    #[must_use]
    pub fn get(&self, key: &SeasonKey) -> Option<&SeasonRecord> {
        self.seasons.get(key)
    }

    pub fn get_mut(&mut self, key: &SeasonKey) -> Option<&mut SeasonRecord> {
        self.seasons.get_mut(key)
    }

    #[must_use]
    pub fn contains(&self, key: &SeasonKey) -> bool {
        self.seasons.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeasonRecord> {
        self.seasons.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SeasonRecord> {
        self.seasons.values_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SeasonKey> {
        self.seasons.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seasons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<SeasonRecord> {
        self.seasons.into_values().collect()
    }
}

impl From<Vec<SeasonRecord>> for SeasonSet {
    fn from(records: Vec<SeasonRecord>) -> Self {
        Self::from_records(records)
    }
}

impl From<SeasonSet> for Vec<SeasonRecord> {
    fn from(set: SeasonSet) -> Self {
        set.into_vec()
    }
}

impl IntoIterator for SeasonSet {
    type Item = SeasonRecord;
    type IntoIter = std::collections::btree_map::IntoValues<SeasonKey, SeasonRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.seasons.into_values()
    }
}
