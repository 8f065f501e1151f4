use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Media category a recommendation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
    Book,
    /// Any discriminant the history store knows about that we don't
    #[serde(other)]
    Other,
}

impl MediaType {
    /// Front-end route prefix for detail pages
    pub fn route_prefix(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
            MediaType::Book => "book",
            MediaType::Other => "media",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Movie => write!(f, "movie"),
            MediaType::Tv => write!(f, "tv"),
            MediaType::Book => write!(f, "book"),
            MediaType::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// A fully fetched media entity, as returned by the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    pub id: u64,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default, alias = "first_air_date")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub overview: Option<String>,
}

impl MediaItem {
    /// Year component of the release date, if the date is usable
    pub fn release_year(&self) -> Option<i32> {
        self.release_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok())
    }

    /// First two genre names, comma separated
    pub fn genre_summary(&self) -> String {
        self.genres
            .iter()
            .take(2)
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Identifier of a past recommendation result.
///
/// The history store is loosely typed: ids arrive as integers, floats or
/// strings, and occasionally as something else entirely. Unusable ids are
/// kept as `Other` so one bad record never rejects its batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CandidateId {
    Number(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl CandidateId {
    /// Coerces the id into a catalog id. Zero, negative, fractional and
    /// non-numeric ids yield `None`.
    pub fn as_positive_id(&self) -> Option<u64> {
        let id = match self {
            CandidateId::Number(n) => u64::try_from(*n).ok()?,
            CandidateId::Float(f) => {
                if f.fract() != 0.0 || *f < 1.0 || *f >= u64::MAX as f64 {
                    return None;
                }
                *f as u64
            }
            CandidateId::Text(s) => s.trim().parse::<u64>().ok()?,
            CandidateId::Other(_) => return None,
        };
        (id > 0).then_some(id)
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateId::Number(n) => write!(f, "{}", n),
            CandidateId::Float(n) => write!(f, "{}", n),
            CandidateId::Text(s) => write!(f, "{}", s),
            CandidateId::Other(v) => write!(f, "{}", v),
        }
    }
}

/// One result inside a past recommendation batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateRecord {
    #[serde(default)]
    pub id: Option<CandidateId>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl CandidateRecord {
    pub fn has_artwork(&self) -> bool {
        self.poster_path.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// A recommendation batch the user received earlier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentRecommendationEntry {
    #[serde(rename = "mediaType", alias = "media_type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub results: Vec<CandidateRecord>,
}

/// Outcome of a resolution: the picked item and its match score.
///
/// An absent item always carries a zero score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resolution {
    pub item: Option<MediaItem>,
    pub confidence: u8,
}

impl Resolution {
    pub fn new(item: Option<MediaItem>, confidence: u8) -> Self {
        let confidence = if item.is_some() { confidence.min(100) } else { 0 };
        Self { item, confidence }
    }

    pub fn picked(item: MediaItem, confidence: u8) -> Self {
        Self::new(Some(item), confidence)
    }

    /// The exhausted-cascade outcome
    pub fn none() -> Self {
        Self::new(None, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.item.is_none()
    }
}
