//! Month grid view model and the render token that orders async renders.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Datelike, Months, NaiveDate};

use crate::cache::{EmotionMap, MonthKey};
use crate::store::EntryStore;

pub const ROWS: usize = 6;
pub const COLUMNS: usize = 7;

/// Canonical `YYYY-MM-DD` key for a calendar day. `month` is 1-based.
pub fn format_date_key(year: i32, month: u32, day: u32) -> String {
    format!("{year}-{month:02}-{day:02}")
}

pub fn date_key(date: NaiveDate) -> String {
    format_date_key(date.year(), date.month(), date.day())
}

/// The month the calendar is showing. Always points at day one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    first: NaiveDate,
}

impl MonthCursor {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(self) -> i32 {
        self.first.year()
    }

    pub fn month(self) -> u32 {
        self.first.month()
    }

    pub fn key(self) -> MonthKey {
        MonthKey::new(self.year(), self.month())
    }

    pub fn previous(self) -> Self {
        Self {
            first: self
                .first
                .checked_sub_months(Months::new(1))
                .unwrap_or(self.first),
        }
    }

    pub fn next(self) -> Self {
        Self {
            first: self
                .first
                .checked_add_months(Months::new(1))
                .unwrap_or(self.first),
        }
    }

    pub fn days_in_month(self) -> u32 {
        self.first
            .checked_add_months(Months::new(1))
            .map(|next| next.signed_duration_since(self.first).num_days() as u32)
            .unwrap_or(31)
    }

    /// Column of day one, Sunday first.
    pub fn leading_blanks(self) -> u32 {
        self.first.weekday().num_days_from_sunday()
    }

    /// Header text, e.g. "March 2024".
    pub fn label(self) -> String {
        self.first.format("%B %Y").to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarCell {
    /// `None` for the blank cells around the month.
    pub day: Option<u32>,
    pub date_key: String,
    pub is_today: bool,
    pub is_selected: bool,
    pub has_entry: bool,
    pub background: Option<&'static str>,
    pub icon: Option<String>,
}

impl CalendarCell {
    fn blank() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.day.is_none()
    }

    pub fn css_classes(&self) -> String {
        if self.is_empty() {
            return "empty".to_string();
        }
        let mut classes = Vec::new();
        if self.is_today {
            classes.push("today");
        }
        if self.has_entry {
            classes.push("has-entry");
        }
        if self.is_selected {
            classes.push("selected");
        }
        classes.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarView {
    pub cursor: MonthCursor,
    pub label: String,
    pub rows: Vec<Vec<CalendarCell>>,
}

impl CalendarView {
    pub fn cell(&self, date_key: &str) -> Option<&CalendarCell> {
        self.rows
            .iter()
            .flatten()
            .find(|c| !c.is_empty() && c.date_key == date_key)
    }

    /// Re-mark the selected day without rebuilding the grid.
    pub fn mark_selected(&mut self, selected: Option<&str>) {
        for cell in self.rows.iter_mut().flatten() {
            cell.is_selected = !cell.is_empty() && Some(cell.date_key.as_str()) == selected;
        }
    }
}

/// Build the 6×7 grid for `cursor` from the entry store and the month's marks.
pub fn build_month_grid(
    cursor: MonthCursor,
    entries: &EntryStore,
    marks: &EmotionMap,
    today: NaiveDate,
    selected: Option<&str>,
) -> CalendarView {
    let today_key = date_key(today);
    let leading = cursor.leading_blanks();
    let days = cursor.days_in_month();

    let mut rows = Vec::with_capacity(ROWS);
    let mut day = 1;
    for row in 0..ROWS {
        let mut cells = Vec::with_capacity(COLUMNS);
        for col in 0..COLUMNS as u32 {
            if (row == 0 && col < leading) || day > days {
                cells.push(CalendarCell::blank());
                continue;
            }

            let key = format_date_key(cursor.year(), cursor.month(), day);
            let has_entry = entries.has_entries_on(&key);
            let mark = if has_entry { marks.get(&key) } else { None };

            cells.push(CalendarCell {
                day: Some(day),
                is_today: key == today_key,
                is_selected: selected == Some(key.as_str()),
                has_entry,
                background: mark.map(|m| m.background()),
                icon: mark.and_then(|m| m.icon.clone()),
                date_key: key,
            });
            day += 1;
        }
        rows.push(cells);
    }

    CalendarView {
        cursor,
        label: cursor.label(),
        rows,
    }
}

/// Opaque token for one render attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket(u64);

/// Monotonic render token.
///
/// Each render takes a ticket before it awaits anything; only the holder of
/// the latest ticket may commit its grid.
#[derive(Debug, Default)]
pub struct RenderGate {
    latest: AtomicU64,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RenderTicket {
        RenderTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: RenderTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}
