//! The diary page's client state and every operation that mutates it.
//!
//! [`Diary`] owns the entry store, the emotion map cache, the selected date,
//! the form and the rendered views. State sits behind a plain mutex that is
//! never held across an await; network calls happen between short critical
//! sections. Calendar renders are ordered by a [`RenderGate`], so a render
//! that was overtaken while waiting on the network drops its grid instead of
//! overwriting a newer one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::time::Instant;

use crate::api::DiaryBackend;
use crate::auth::UserStore;
use crate::cache::{build_emotion_map, EmotionMap, EmotionMapCache, MonthKey};
use crate::calendar::{build_month_grid, CalendarView, MonthCursor, RenderGate};
use crate::entry_list::EntryListView;
use crate::form::{EntryFields, EntryForm, EntrySubmission};
use crate::models::{entry::DATE_KEY_FORMAT, Entry};
use crate::notice::Notice;
use crate::store::EntryStore;

pub const LOAD_ERROR: &str = "Error loading entries.";
pub const ADD_ERROR: &str = "Error adding entry.";
pub const DELETE_ERROR: &str = "Error deleting entry.";
pub const MISSING_ID_WARNING: &str = "No entry ID provided for deletion.";
pub const DELETE_CONFIRMATION: &str = "Delete this entry?";

struct DiaryState {
    entries: EntryStore,
    emotions: EmotionMapCache,
    cursor: MonthCursor,
    selected: Option<String>,
    form: EntryForm,
    list: EntryListView,
    calendar: Option<CalendarView>,
    notice: Option<Notice>,
}

impl DiaryState {
    fn new(cursor: MonthCursor, cache_ttl: Duration) -> Self {
        Self {
            entries: EntryStore::new(),
            emotions: EmotionMapCache::new(cache_ttl),
            cursor,
            selected: None,
            form: EntryForm::default(),
            list: EntryListView::Hidden,
            calendar: None,
            notice: None,
        }
    }

    /// Re-derive the entry list from the active filter.
    fn refresh_list(&mut self) {
        self.list = match &self.selected {
            Some(date) => EntryListView::render(&self.entries.on_date(date)),
            None => EntryListView::Hidden,
        };
    }

    fn set_selected(&mut self, selected: Option<String>) {
        self.selected = selected;
        if let Some(calendar) = self.calendar.as_mut() {
            calendar.mark_selected(self.selected.as_deref());
        }
    }

    fn notify(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }
}

/// Snapshot handed to a render target.
#[derive(Debug, Clone)]
pub struct DiaryView {
    pub cursor: MonthCursor,
    pub calendar: Option<CalendarView>,
    pub selected: Option<String>,
    pub list: EntryListView,
    pub form: EntryForm,
    pub notice: Option<Notice>,
}

impl DiaryView {
    pub fn filter_active(&self) -> bool {
        self.selected.is_some()
    }

    pub fn month_label(&self) -> String {
        self.cursor.label()
    }
}

pub struct Diary {
    backend: Arc<dyn DiaryBackend>,
    users: UserStore,
    gate: RenderGate,
    cache_ttl: Duration,
    today: fn() -> NaiveDate,
    state: Mutex<DiaryState>,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl Diary {
    pub fn new(backend: Arc<dyn DiaryBackend>, users: UserStore, cache_ttl: Duration) -> Self {
        let today = local_today;
        Self {
            backend,
            users,
            gate: RenderGate::new(),
            cache_ttl,
            today,
            state: Mutex::new(DiaryState::new(
                MonthCursor::containing(today()),
                cache_ttl,
            )),
        }
    }

    /// Pin "today", which decides the today marker and the starting month.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self.state().cursor = MonthCursor::containing(today());
        self
    }

    fn state(&self) -> MutexGuard<'_, DiaryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notice: Notice) {
        self.state().notify(notice);
    }

    pub fn view(&self) -> DiaryView {
        let state = self.state();
        let now = Instant::now();
        DiaryView {
            cursor: state.cursor,
            calendar: state.calendar.clone(),
            selected: state.selected.clone(),
            list: state.list.clone(),
            form: state.form.clone(),
            notice: state.notice.clone().filter(|n| n.is_visible(now)),
        }
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.state().entries.all().to_vec()
    }

    pub fn entry(&self, id: &str) -> Option<Entry> {
        self.state().entries.find(id).cloned()
    }

    pub fn selected_date(&self) -> Option<String> {
        self.state().selected.clone()
    }

    pub fn cursor(&self) -> MonthCursor {
        self.state().cursor
    }

    pub fn cached_months(&self) -> usize {
        self.state().emotions.len()
    }

    /// Refetch when the store was never loaded or is older than the cache
    /// TTL. Returns whether the store was replaced.
    pub async fn ensure_fresh(&self) -> bool {
        let fresh = self
            .state()
            .entries
            .is_fresh(Instant::now(), self.cache_ttl);
        !fresh && self.fetch_entries().await
    }

    /// Page load. When nothing was refetched the calendar is re-rendered
    /// from the store, so the today marker and expired emotion months
    /// still update.
    pub async fn ensure_loaded(&self) {
        if !self.ensure_fresh().await {
            self.render_calendar().await;
        }
    }

    /// Replace the store from the backend and re-render. Returns false when
    /// signed out or when the fetch failed.
    pub async fn fetch_entries(&self) -> bool {
        let Some(user) = self.users.load().await else {
            return false;
        };

        match self.backend.list_entries(&user).await {
            Ok(entries) => {
                tracing::debug!(count = entries.len(), "entries fetched");
                {
                    let mut state = self.state();
                    state.entries.replace_all(entries, Instant::now());
                    state.emotions.invalidate_all();
                }
                self.render_calendar().await;
                self.state().refresh_list();
                true
            }
            Err(e) => {
                tracing::error!("Failed to fetch entries: {e}");
                self.notify(Notice::error(LOAD_ERROR, Instant::now()));
                false
            }
        }
    }

    /// Marks for one month, from cache when fresh.
    ///
    /// A failed fetch yields an empty map and leaves the cache untouched.
    pub async fn emotions_map(&self, key: MonthKey) -> Arc<EmotionMap> {
        let (cached, generation) = {
            let state = self.state();
            (
                state.emotions.get(key, Instant::now()),
                state.emotions.generation(),
            )
        };
        if let Some(map) = cached {
            return map;
        }

        let Some(user) = self.users.load().await else {
            return Arc::new(EmotionMap::new());
        };

        match self.backend.list_emotions(&user).await {
            Ok(records) => {
                let map = Arc::new(build_emotion_map(&records));
                let stored =
                    self.state()
                        .emotions
                        .insert(key, Arc::clone(&map), Instant::now(), generation);
                if !stored {
                    tracing::debug!(month = %key, "emotion map outdated by a mutation, not cached");
                }
                map
            }
            Err(e) => {
                tracing::warn!(month = %key, "Failed to fetch emotions: {e}");
                Arc::new(EmotionMap::new())
            }
        }
    }

    /// Render the current month. Returns false when a newer render took over
    /// while this one was waiting on the emotion map.
    pub async fn render_calendar(&self) -> bool {
        let ticket = self.gate.issue();
        let cursor = self.state().cursor;
        let marks = self.emotions_map(cursor.key()).await;

        let mut state = self.state();
        if !self.gate.is_current(ticket) {
            tracing::debug!(month = %cursor.key(), "discarding superseded calendar render");
            return false;
        }
        let view = build_month_grid(
            cursor,
            &state.entries,
            &marks,
            (self.today)(),
            state.selected.as_deref(),
        );
        state.calendar = Some(view);
        true
    }

    pub async fn show_month(&self, year: i32, month: u32) -> bool {
        let Some(cursor) = MonthCursor::new(year, month) else {
            tracing::warn!(year, month, "ignoring invalid month");
            return false;
        };
        self.state().cursor = cursor;
        self.render_calendar().await
    }

    pub async fn previous_month(&self) -> bool {
        let cursor = self.cursor().previous();
        self.show_month(cursor.year(), cursor.month()).await
    }

    pub async fn next_month(&self) -> bool {
        let cursor = self.cursor().next();
        self.show_month(cursor.year(), cursor.month()).await
    }

    /// Day click on the calendar.
    ///
    /// A day with entries toggles the filter; an empty day selects itself and
    /// opens the form for a new entry. Either way the form's date is set.
    pub fn click_day(&self, date_key: &str) -> bool {
        if NaiveDate::parse_from_str(date_key, DATE_KEY_FORMAT).is_err() {
            tracing::warn!(date_key, "ignoring click on malformed date");
            return false;
        }

        let mut state = self.state();
        let day_entries = state.entries.on_date(date_key);
        if day_entries.is_empty() {
            state.set_selected(Some(date_key.to_string()));
            state.list = EntryListView::Empty;
            state.form.show();
        } else if state.selected.as_deref() == Some(date_key) {
            state.set_selected(None);
            state.form.hide();
            state.list = EntryListView::Hidden;
        } else {
            state.set_selected(Some(date_key.to_string()));
            state.form.show();
            state.list = EntryListView::render(&day_entries);
        }
        state.form.prefill_date(date_key);
        true
    }

    pub fn reset_filter(&self) {
        let mut state = self.state();
        state.set_selected(None);
        state.form.hide();
        state.list = EntryListView::Hidden;
    }

    pub fn enter_edit(&self, id: &str) -> bool {
        let mut state = self.state();
        let Some(entry) = state.entries.find(id).cloned() else {
            tracing::warn!(entry_id = id, "edit requested for unknown entry");
            return false;
        };
        state.form.enter_edit(&entry, id);
        state.notice = None;
        true
    }

    pub fn exit_edit(&self) {
        let mut state = self.state();
        state.form.exit_edit();
        state.notice = None;
    }

    /// Form submit: validate, then create or update depending on the mode.
    pub async fn submit(&self, submission: EntrySubmission) {
        if submission.icon.as_deref().is_some_and(|i| !i.is_empty()) {
            tracing::debug!("dropping client-supplied icon");
        }

        let fields = match submission.validate() {
            Ok(fields) => fields,
            Err(message) => {
                let mut state = self.state();
                state.form.remember(&submission);
                state.notify(Notice::error(message, Instant::now()));
                return;
            }
        };

        let target = self.state().form.edit_target().map(str::to_string);
        match target {
            Some(id) => self.update_entry(&id, fields).await,
            None => self.add_entry(fields).await,
        }
    }

    pub async fn add_entry(&self, fields: EntryFields) {
        let Some(user) = self.users.load().await else {
            return;
        };
        let draft = fields.into_draft(&user.user_id);

        match self.backend.create_entry(&user, &draft).await {
            Ok(created) => {
                tracing::info!(entry_id = ?created.id, date = %created.date, "entry created");
                {
                    let mut state = self.state();
                    state.notify(Notice::info("Entry added!", Instant::now()));
                    state.form.reset();
                    state.form.hide();
                    state.emotions.invalidate_all();
                }
                self.fetch_entries().await;
            }
            Err(e) => {
                tracing::error!("Failed to add entry: {e}");
                self.notify(Notice::error(ADD_ERROR, Instant::now()));
            }
        }
    }

    pub async fn update_entry(&self, id: &str, fields: EntryFields) {
        let Some(user) = self.users.load().await else {
            return;
        };
        let draft = fields.into_draft(&user.user_id);

        match self.backend.update_entry(&user, id, &draft).await {
            Ok(updated) => {
                tracing::info!(entry_id = id, "entry updated");
                {
                    let mut state = self.state();
                    if !state.entries.replace(id, updated) {
                        tracing::debug!(entry_id = id, "updated entry was not in the store");
                    }
                    state.notify(Notice::info("Entry updated!", Instant::now()));
                    state.form.exit_edit();
                    state.emotions.invalidate_all();
                }
                self.fetch_entries().await;
            }
            Err(e) => {
                tracing::error!(entry_id = id, "Failed to update entry: {e}");
                self.notify(Notice::error(
                    format!("Error updating entry: {e}"),
                    Instant::now(),
                ));
            }
        }
    }

    /// Delete after an explicit confirmation. Without an id this only warns.
    pub async fn delete_entry(&self, id: Option<&str>, confirmed: bool) {
        let Some(id) = id.filter(|id| !id.trim().is_empty()) else {
            self.notify(Notice::error(MISSING_ID_WARNING, Instant::now()));
            return;
        };
        let Some(user) = self.users.load().await else {
            return;
        };
        if !confirmed {
            return;
        }

        if let Err(e) = self.backend.delete_entry(&user, id).await {
            tracing::error!(entry_id = id, "Failed to delete entry: {e}");
            self.notify(Notice::error(DELETE_ERROR, Instant::now()));
            return;
        }

        tracing::info!(entry_id = id, "entry deleted");
        {
            let mut state = self.state();
            state.entries.remove(id);
            state.notify(Notice::info("Entry deleted!", Instant::now()));
            state.emotions.invalidate_all();
            state.form.exit_edit();
        }

        self.render_calendar().await;

        let mut state = self.state();
        if let Some(selected) = state.selected.clone() {
            let remaining = state.entries.on_date(&selected);
            if remaining.is_empty() {
                state.set_selected(None);
                state.list = EntryListView::Empty;
            } else {
                state.list = EntryListView::render(&remaining);
            }
        }
    }

    /// Forget everything held for the signed-out user.
    pub fn clear(&self) {
        let cursor = MonthCursor::containing((self.today)());
        *self.state() = DiaryState::new(cursor, self.cache_ttl);
    }
}
