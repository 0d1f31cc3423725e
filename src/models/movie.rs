use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::WorkId;

/// A catalog movie, annotated with where it can be watched or rented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub work_id: WorkId,

    pub name: String,
    pub original_name: String,
    #[serde(default)]
    pub english_name: Option<String>,

    /// Minutes.
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub age_rating: Option<String>,

    #[serde(default)]
    pub genres: Vec<String>,
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
    #[serde(default)]
    pub trailer_url: Option<String>,

    #[serde(default)]
    pub platforms: BTreeMap<String, String>,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl MovieRecord {
    #[must_use]
    pub fn new(work_id: WorkId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            work_id,
            original_name: name.clone(),
            name,
            english_name: None,
            runtime: None,
            release_date: None,
            age_rating: None,
            genres: Vec::new(),
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

    /// Takes every catalog-sourced field from `incoming`, keeping a curated
    /// trailer when the incoming record has none.
    pub fn update_from(&mut self, incoming: Self) {
        let work_id = self.work_id;
        let trailer_url = incoming.trailer_url.clone().or_else(|| self.trailer_url.take());

        *self = incoming;
        self.work_id = work_id;
        self.trailer_url = trailer_url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_keeps_curated_trailer() {
        let mut stored = MovieRecord::new(WorkId::new(7), "寄生上流");
        stored.trailer_url = Some("https://video.example.com/trailer".to_string());
        stored.runtime = Some(131);

        let mut incoming = MovieRecord::new(WorkId::new(7), "寄生上流");
        incoming.runtime = Some(132);
        stored.update_from(incoming);

        assert_eq!(stored.runtime, Some(132));
        assert_eq!(stored.trailer_url.as_deref(), Some("https://video.example.com/trailer"));
    }
}
