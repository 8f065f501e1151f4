use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::db::store::SlotStore;
use crate::models::{MediaItem, Resolution};

/// Default key of the hero cache slot
pub const HERO_CACHE_KEY: &str = "kahani_hero_movie_cache";

/// Age at which a cached pick stops being served
pub const HERO_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Source of "now" for freshness checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The record stored in the hero cache slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedRecommendation {
    #[serde(rename = "movie")]
    pub item: Option<MediaItem>,
    #[serde(rename = "matchPercentage")]
    pub confidence: u8,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl CachedRecommendation {
    pub fn new(item: Option<MediaItem>, confidence: u8, captured_at: DateTime<Utc>) -> Self {
        let confidence = if item.is_some() { confidence } else { 0 };
        Self {
            item,
            confidence,
            // the slot stores milliseconds
            captured_at: DateTime::from_timestamp_millis(captured_at.timestamp_millis())
                .unwrap_or(captured_at),
        }
    }

    fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.captured_at);
        age.num_milliseconds() < HERO_CACHE_TTL.as_millis() as i64
    }
}

impl From<CachedRecommendation> for Resolution {
    fn from(cached: CachedRecommendation) -> Self {
        Resolution::new(cached.item, cached.confidence)
    }
}

/// Single-slot, time-bounded cache of the last resolved hero pick
///
/// The cache is advisory. Reads degrade to a miss and writes are dropped on
/// any failure; neither ever reaches the caller.
#[derive(Clone)]
pub struct HeroCache {
    store: Arc<dyn SlotStore>,
    clock: Arc<dyn Clock>,
    key: String,
}

impl HeroCache {
    pub fn new(store: Arc<dyn SlotStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            key: key.into(),
        }
    }

    /// Replaces the clock used for timestamps and freshness checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the cached pick if one exists and is younger than the TTL
    pub fn read(&self) -> Option<CachedRecommendation> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %self.key,
                    store = self.store.name(),
                    "Error reading hero cache"
                );
                return None;
            }
        };

        let cached: CachedRecommendation = match serde_json::from_str(&raw) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(error = %e, key = %self.key, "Discarding unreadable hero cache entry");
                return None;
            }
        };

        if cached.confidence > 100 {
            tracing::warn!(
                confidence = cached.confidence,
                key = %self.key,
                "Discarding hero cache entry with out-of-range score"
            );
            return None;
        }

        if !cached.is_fresh_at(self.clock.now()) {
            tracing::debug!(
                key = %self.key,
                captured_at = %cached.captured_at,
                "Hero cache entry is stale"
            );
            return None;
        }

        Some(CachedRecommendation::new(
            cached.item,
            cached.confidence,
            cached.captured_at,
        ))
    }

    /// Overwrites the slot with the given pick, stamped with the current time
    pub fn write(&self, item: Option<&MediaItem>, confidence: u8) {
        let record = CachedRecommendation::new(item.cloned(), confidence, self.clock.now());

        let json = match serde_json::to_string(&record) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!(error = %e, "Hero cache serialization error");
                return;
            }
        };

        match self.store.set(&self.key, &json) {
            Ok(()) => tracing::debug!(
                key = %self.key,
                store = self.store.name(),
                item_id = record.item.as_ref().map(|i| i.id),
                confidence = record.confidence,
                "Hero cache updated"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                key = %self.key,
                store = self.store.name(),
                "Error setting hero cache"
            ),
        }
    }
}
