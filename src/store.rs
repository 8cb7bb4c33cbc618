use std::time::Duration;

use tokio::time::Instant;

use crate::models::Entry;

/// In-memory copy of the signed-in user's entries.
///
/// Source of truth for the calendar and entry list until the next fetch.
#[derive(Debug, Default, Clone)]
pub struct EntryStore {
    entries: Vec<Entry>,
    fetched_at: Option<Instant>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a fetch has succeeded at least once.
    pub fn is_loaded(&self) -> bool {
        self.fetched_at.is_some()
    }

    /// Loaded and fetched less than `max_age` ago.
    pub fn is_fresh(&self, now: Instant, max_age: Duration) -> bool {
        self.fetched_at
            .is_some_and(|at| now.saturating_duration_since(at) < max_age)
    }

    pub fn replace_all(&mut self, entries: Vec<Entry>, now: Instant) {
        self.entries = entries;
        self.fetched_at = Some(now);
    }

    pub fn all(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries on `date_key`, in fetch order.
    pub fn on_date(&self, date_key: &str) -> Vec<Entry> {
        self.entries
            .iter()
            .filter(|e| e.is_on(date_key))
            .cloned()
            .collect()
    }

    pub fn has_entries_on(&self, date_key: &str) -> bool {
        self.entries.iter().any(|e| e.is_on(date_key))
    }

    pub fn find(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id.as_deref() == Some(id))
    }

    /// Swap in the server's copy of an entry. Returns false when `id` isn't held.
    pub fn replace(&mut self, id: &str, entry: Entry) -> bool {
        match self.entries.iter_mut().find(|e| e.id.as_deref() == Some(id)) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id.as_deref() != Some(id));
        self.entries.len() != before
    }
}
