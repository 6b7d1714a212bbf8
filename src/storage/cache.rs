use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarEvent;
use crate::storage::store::{KeyValueStore, StoreError};

/// How far back persisted entries keep finished events. Bounds storage size;
/// the full parsed set is still returned to the request that produced it.
const RETENTION_DAYS: i64 = 90;

/// Persisted shape: the parsed occurrence list plus the write instant.
/// Age is always measured against `timestamp` at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub events: Vec<CalendarEvent>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaleRead {
    pub events: Vec<CalendarEvent>,
    pub is_stale: bool,
}

/// Feed-keyed occurrence cache over the key-value store. Corrupted stored
/// entries read as misses, never as errors. The freshness window set at
/// construction is what `get_allowing_stale` measures staleness against.
pub struct FeedCache {
    store: Arc<dyn KeyValueStore>,
    freshness: Duration,
}

impl FeedCache {
    pub fn new(store: Arc<dyn KeyValueStore>, freshness: Duration) -> Self {
        Self { store, freshness }
    }

    /// Storage key derived from the feed URL, hashed so arbitrary URLs fit
    /// the store's key constraints. FNV-1a, fixed for all time: persisted
    /// entries must survive toolchain upgrades.
    pub fn cache_key(url: &str) -> String {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in url.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        format!("feed:{:016x}", hash)
    }

    pub async fn get(&self, url: &str, max_age: Duration) -> Option<Vec<CalendarEvent>> {
        let entry = self.read_entry(url).await?;
        if Self::age(&entry) < max_age {
            Some(entry.events)
        } else {
            None
        }
    }

    /// Returns whatever is stored regardless of age, flagging staleness
    /// against the cache's freshness window.
    pub async fn get_allowing_stale(&self, url: &str) -> Option<StaleRead> {
        let entry = self.read_entry(url).await?;
        let is_stale = Self::age(&entry) >= self.freshness;
        Some(StaleRead {
            events: entry.events,
            is_stale,
        })
    }

    pub async fn put(&self, url: &str, events: &[CalendarEvent]) -> Result<(), StoreError> {
        let now = Utc::now();
        let horizon = now - Duration::days(RETENTION_DAYS);
        let retained: Vec<CalendarEvent> = events
            .iter()
            .filter(|e| e.end_instant() >= horizon)
            .cloned()
            .collect();
        let entry = CacheEntry {
            events: retained,
            timestamp: now.timestamp(),
        };
        let json = serde_json::to_string(&entry)?;
        self.store.set(&Self::cache_key(url), &json).await
    }

    async fn read_entry(&self, url: &str) -> Option<CacheEntry> {
        let key = Self::cache_key(url);
        let raw = match self.store.get(&key).await {
            Ok(value) => value?,
            Err(err) => {
                tracing::warn!("Cache read failed for {}: {}", key, err);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                // Corrupted entry is a miss, not an error.
                tracing::warn!("Discarding corrupted cache entry {}: {}", key, err);
                None
            }
        }
    }

    fn age(entry: &CacheEntry) -> Duration {
        let written = DateTime::<Utc>::from_timestamp(entry.timestamp, 0).unwrap_or_default();
        Utc::now() - written
    }
}
