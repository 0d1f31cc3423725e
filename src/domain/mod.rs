//! Domain types for catalog works and streaming platforms with strong typing.
//!
//! This module follows the Newtype pattern so catalog identifiers, season
//! numbers and platform identifiers cannot be mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a work in the external media catalog.
///
/// # Examples
///
/// ```rust
/// use dramawatch::domain::WorkId;
///
/// let id = WorkId::new(93405);
/// assert_eq!(id.value(), 93405);
/// assert_eq!(id.to_string(), "93405");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WorkId(u64);

impl WorkId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for WorkId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl Serialize for WorkId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for WorkId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Self::new)
    }
}

/// Season number within a multi-season work.
///
/// Season `0` is the catalog's "specials" bucket and never surfaces as a
/// season record; regular seasons start at `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SeasonNumber(u32);

impl SeasonNumber {
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Returns true for the specials bucket.
    #[must_use]
    pub const fn is_specials(&self) -> bool {
        self.0 == 0
    }

    /// Sequels carry the season number in their display names.
    #[must_use]
    pub const fn is_sequel(&self) -> bool {
        self.0 >= 2
    }
}

impl fmt::Display for SeasonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SeasonNumber {
    fn from(number: u32) -> Self {
        Self::new(number)
    }
}

impl Serialize for SeasonNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for SeasonNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        u32::deserialize(deserializer).map(Self::new)
    }
}

/// The (work id, season number) fingerprint that uniquely identifies a
/// season record in persisted storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeasonKey {
    pub work_id: WorkId,
    pub season_number: SeasonNumber,
}

impl SeasonKey {
    #[must_use]
    pub const fn new(work_id: WorkId, season_number: SeasonNumber) -> Self {
        Self {
            work_id,
            season_number,
        }
    }
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/S{}", self.work_id, self.season_number)
    }
}

/// Kind of work a platform listing or a lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    Drama,
    Movie,
}

impl WorkType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Drama => "drama",
            Self::Movie => "movie",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drama" | "tv" => Ok(Self::Drama),
            "movie" | "film" => Ok(Self::Movie),
            other => Err(DomainError::UnknownWorkType(other.to_string())),
        }
    }
}

/// Identifier of one scraped platform listing.
///
/// Identifiers encode the listing's work type as a suffix, e.g.
/// `"LINE TV-drama"` or `"MyVideo-movie"`. The part before the suffix is the
/// base name reported to consumers of availability lookups.
///
/// ```rust
/// use dramawatch::domain::{PlatformId, WorkType};
///
/// let id: PlatformId = "LINE TV-drama".parse().unwrap();
/// assert_eq!(id.base_name(), "LINE TV");
/// assert_eq!(id.work_type(), WorkType::Drama);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlatformId {
    base_name: String,
    work_type: WorkType,
}

impl PlatformId {
    #[must_use]
    pub fn new(base_name: impl Into<String>, work_type: WorkType) -> Self {
        Self {
            base_name: base_name.into(),
            work_type,
        }
    }

    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    #[must_use]
    pub const fn work_type(&self) -> WorkType {
        self.work_type
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base_name, self.work_type)
    }
}

impl FromStr for PlatformId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, suffix) = s
            .rsplit_once('-')
            .ok_or_else(|| DomainError::InvalidPlatformId(s.to_string()))?;

        if base.trim().is_empty() {
            return Err(DomainError::InvalidPlatformId(s.to_string()));
        }

        let work_type = match suffix {
            "drama" => WorkType::Drama,
            "movie" => WorkType::Movie,
            _ => return Err(DomainError::InvalidPlatformId(s.to_string())),
        };

        Ok(Self::new(base, work_type))
    }
}

impl Serialize for PlatformId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PlatformId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Unknown work type: {0}")]
    UnknownWorkType(String),

    #[error("Platform id must look like '<name>-drama' or '<name>-movie', got '{0}'")]
    InvalidPlatformId(String),
}
