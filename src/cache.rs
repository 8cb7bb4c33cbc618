//! Per-month emotion map cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::models::{EmotionMark, EmotionRecord, Sentiment};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Date key to calendar mark.
pub type EmotionMap = BTreeMap<String, EmotionMark>;

/// Cache slot key, displayed as `"{year}-{month}"` with a 1-based month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

struct Slot {
    map: Arc<EmotionMap>,
    fetched_at: Instant,
}

pub struct EmotionMapCache {
    ttl: Duration,
    slots: HashMap<MonthKey, Slot>,
    generation: u64,
}

impl EmotionMapCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: HashMap::new(),
            generation: 0,
        }
    }

    /// Bumped by every invalidation. A fetch records it before going to the
    /// network and hands it back to [`insert`](Self::insert).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A fresh slot, or `None` when missing or at least `ttl` old.
    pub fn get(&self, key: MonthKey, now: Instant) -> Option<Arc<EmotionMap>> {
        let slot = self.slots.get(&key)?;
        if now.saturating_duration_since(slot.fetched_at) < self.ttl {
            Some(Arc::clone(&slot.map))
        } else {
            None
        }
    }

    /// Store a fetched map. Skipped when the cache was invalidated after the
    /// fetch started, so a pre-mutation map is never served afterwards.
    pub fn insert(
        &mut self,
        key: MonthKey,
        map: Arc<EmotionMap>,
        now: Instant,
        generation: u64,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.slots.insert(
            key,
            Slot {
                map,
                fetched_at: now,
            },
        );
        true
    }

    /// Drop every month. Called after any entry mutation.
    pub fn invalidate_all(&mut self) {
        if !self.slots.is_empty() {
            tracing::debug!(months = self.slots.len(), "emotion map cache cleared");
        }
        self.slots.clear();
        self.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for EmotionMapCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Fold emotion records into one mark per date.
///
/// First-available policy, in fetch order: the sentiment comes from the first
/// record with a recognised sentiment, the icon from the first record with a
/// non-empty icon. Records without a date are skipped.
pub fn build_emotion_map(records: &[EmotionRecord]) -> EmotionMap {
    let mut map = EmotionMap::new();
    for record in records {
        let Some(date) = record.date.as_deref().filter(|d| !d.is_empty()) else {
            continue;
        };
        let mark = map.entry(date.to_string()).or_default();
        if mark.sentiment.is_none() {
            mark.sentiment = Sentiment::parse(&record.sentiment);
        }
        if mark.icon.is_none() && !record.icon.trim().is_empty() {
            mark.icon = Some(record.icon.clone());
        }
    }
    map
}
