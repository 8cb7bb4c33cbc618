use serde::Deserialize;

use crate::models::{Entry, EntryDraft};

pub const REQUIRED_FIELDS_MESSAGE: &str = "Date and content are required.";

/// Raw form post. `icon` is accepted so that a client-picked icon can be
/// received, but it never reaches the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntrySubmission {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub emotions: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// A validated submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFields {
    pub date: String,
    pub content: String,
    pub emotions: Vec<String>,
}

impl EntryFields {
    pub fn into_draft(self, user_id: &str) -> EntryDraft {
        EntryDraft::new(self.date, self.content, self.emotions, user_id.to_string())
    }
}

/// Comma-separated tags, trimmed and lower-cased, empties dropped.
pub fn parse_emotions(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl EntrySubmission {
    pub fn validate(&self) -> Result<EntryFields, &'static str> {
        let date = self.date.trim();
        let content = self.content.trim();
        if date.is_empty() || content.is_empty() {
            return Err(REQUIRED_FIELDS_MESSAGE);
        }
        Ok(EntryFields {
            date: date.to_string(),
            content: content.to_string(),
            emotions: parse_emotions(&self.emotions),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormMode {
    #[default]
    Add,
    Edit {
        entry_id: String,
    },
}

/// State of the add/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryForm {
    pub visible: bool,
    pub mode: FormMode,
    pub date: String,
    pub content: String,
    pub emotions: String,
}

impl EntryForm {
    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Add => "Add New Entry",
            FormMode::Edit { .. } => "Edit Entry",
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit { .. })
    }

    pub fn edit_target(&self) -> Option<&str> {
        match &self.mode {
            FormMode::Edit { entry_id } => Some(entry_id),
            FormMode::Add => None,
        }
    }

    /// Clear the fields; mode and visibility are left alone.
    pub fn reset(&mut self) {
        self.date.clear();
        self.content.clear();
        self.emotions.clear();
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn enter_edit(&mut self, entry: &Entry, entry_id: &str) {
        self.mode = FormMode::Edit {
            entry_id: entry_id.to_string(),
        };
        self.date = entry.date.clone();
        self.content = entry.content.clone();
        self.emotions = entry.emotions.join(", ");
        self.visible = true;
    }

    pub fn exit_edit(&mut self) {
        self.mode = FormMode::Add;
        self.reset();
        self.hide();
    }

    /// Day click: put the date in the form. Outside edit mode the form is
    /// reset first so a half-typed entry isn't carried over to another day.
    pub fn prefill_date(&mut self, date_key: &str) {
        if !self.is_editing() {
            self.reset();
        }
        self.date = date_key.to_string();
    }

    /// Echo a rejected submission back into the fields.
    pub fn remember(&mut self, submission: &EntrySubmission) {
        self.date = submission.date.clone();
        self.content = submission.content.clone();
        self.emotions = submission.emotions.clone();
        self.visible = true;
    }
}
