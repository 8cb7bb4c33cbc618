use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// A journal entry as returned by the diary backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: String,
    pub content: String,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub user_id: String,
}

impl Entry {
    pub fn is_on(&self, date_key: &str) -> bool {
        self.date == date_key
    }

    pub fn naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_KEY_FORMAT).ok()
    }
}

/// Body of a create or update request.
///
/// There is no icon field: icons are derived by the backend, so whatever the
/// client picked is dropped when a draft is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub date: String,
    pub content: String,
    pub emotions: Vec<String>,
    pub user_id: String,
}

impl EntryDraft {
    pub fn new(date: String, content: String, emotions: Vec<String>, user_id: String) -> Self {
        Self {
            date,
            content,
            emotions,
            user_id,
        }
    }

    pub fn from_entry(entry: &Entry, user_id: &str) -> Self {
        Self {
            date: entry.date.clone(),
            content: entry.content.clone(),
            emotions: entry.emotions.clone(),
            user_id: user_id.to_string(),
        }
    }
}
