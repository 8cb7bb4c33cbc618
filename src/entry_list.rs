use crate::models::Entry;

pub const NO_ENTRIES_MESSAGE: &str = "No entries found for this date.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCard {
    /// Entries read back from the backend may lack an id; their delete control
    /// then only produces a warning.
    pub id: Option<String>,
    pub date_key: String,
    pub title: String,
    pub content: String,
    pub emotions: Vec<String>,
}

impl EntryCard {
    pub fn from_entry(entry: &Entry) -> Self {
        let title = entry
            .naive_date()
            .map(|d| d.format("%A, %B %-d, %Y").to_string())
            .unwrap_or_else(|| entry.date.clone());

        Self {
            id: entry.id.clone(),
            date_key: entry.date.clone(),
            title,
            content: entry.content.clone(),
            emotions: entry.emotions.clone(),
        }
    }

    pub fn has_emotions(&self) -> bool {
        !self.emotions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntryListView {
    /// No date filter active.
    #[default]
    Hidden,
    /// Filtered date with no entries.
    Empty,
    Cards(Vec<EntryCard>),
}

impl EntryListView {
    pub fn render(entries: &[Entry]) -> Self {
        if entries.is_empty() {
            return EntryListView::Empty;
        }
        EntryListView::Cards(entries.iter().map(EntryCard::from_entry).collect())
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, EntryListView::Hidden)
    }

    pub fn cards(&self) -> &[EntryCard] {
        match self {
            EntryListView::Cards(cards) => cards,
            _ => &[],
        }
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        match self {
            EntryListView::Empty => Some(NO_ENTRIES_MESSAGE),
            _ => None,
        }
    }
}
