//! Chart page: tab state plus the panels each tab shows.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;

use crate::api::{ApiError, DiaryBackend};
use crate::auth::UserStore;
use crate::models::{
    AuthUser, ChartData, NegativeInsights, Period, SearchResults, SentimentOverview, WordWeight,
};

/// Tokens that are never drawn in the negative-insight word cloud.
pub const STOP_WORDS: &[&str] = &[
    "today", "didn", "lost", "gentle", "felt", "soft", "lonely", "surviving", "vulnerable",
    "tired", "compassionate", "anxious", "coping", "hurt", "just", "numb", "acceptance", "even",
    "still", "pain", "taught", "patience", "than", "less", "chose", "like", "grief", "visited",
    "hide", "one", "brave", "okay", "judge", "sadness", "warm", "again", "got", "rejected",
    "expected", "myself", "run", "here", "bit", "alone", "small", "noticed", "quiet", "day",
    "healing", "hope",
];

pub const PIE_COLORS: [&str; 10] = [
    "#e57373", "#ffd54f", "#81c784", "#4fc3f7", "#ba68c8", "#ffb74d", "#7986cb", "#a1887f",
    "#90a4ae", "#f06292",
];

/// Positive, neutral, negative.
pub const SENTIMENT_COLORS: [&str; 3] = ["#81c784", "#fff176", "#e57373"];

pub const NO_NEGATIVE_WORDS: &str = "No negative words frequent enough to chart.";
pub const NO_SEARCH_RESULTS: &str = "No matching entries found.";
pub const EMPTY_QUERY: &str = "Enter a keyword to search.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Frequency,
    Sentiment,
    Search,
    Stress,
    Insights,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Frequency,
        Tab::Sentiment,
        Tab::Search,
        Tab::Stress,
        Tab::Insights,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Frequency => "frequency",
            Tab::Sentiment => "sentiment",
            Tab::Search => "search",
            Tab::Stress => "stress",
            Tab::Insights => "insights",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tab::Frequency => "Emotion frequency",
            Tab::Sentiment => "Sentiment overview",
            Tab::Search => "Search",
            Tab::Stress => "Stress",
            Tab::Insights => "Insights",
        }
    }
}

/// Suggested y-axis maximum: a floor of 5, otherwise 15% headroom.
pub fn y_axis_max(data: &[u32]) -> u32 {
    let max = data.iter().copied().max().unwrap_or(0).max(1);
    if max < 5 {
        5
    } else {
        (f64::from(max) * 1.15).ceil() as u32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: u32,
    pub color: String,
    pub height_pct: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyChart {
    pub title: String,
    pub y_max: u32,
    pub bars: Vec<Bar>,
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl FrequencyChart {
    pub fn from_data(data: &ChartData, period: Period) -> Self {
        let values: &[u32] = data.datasets.first().map(|d| d.data.as_slice()).unwrap_or(&[]);
        let colors: &[String] = data
            .datasets
            .first()
            .map(|d| d.background_color.as_slice())
            .unwrap_or(&[]);
        let y_max = y_axis_max(values);

        let bars = values
            .iter()
            .enumerate()
            .map(|(i, &value)| Bar {
                label: data.labels.get(i).cloned().unwrap_or_default(),
                value,
                color: colors
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| SENTIMENT_COLORS[i % SENTIMENT_COLORS.len()].to_string()),
                height_pct: (u64::from(value.min(y_max)) * 100 / u64::from(y_max)) as u32,
            })
            .collect();

        let count = |i: usize| values.get(i).copied().unwrap_or(0);
        Self {
            title: format!("Emotion Frequency - {}", period.label()),
            y_max,
            bars,
            positive: count(0),
            neutral: count(1),
            negative: count(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub count: u32,
    pub color: &'static str,
    pub percent: f64,
}

impl PieSlice {
    pub fn percent_label(&self) -> String {
        format!("{:.1}%", self.percent)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieChart {
    pub slices: Vec<PieSlice>,
}

impl PieChart {
    fn new(items: impl IntoIterator<Item = (String, u32, &'static str)>) -> Self {
        let items: Vec<_> = items.into_iter().collect();
        let total: u32 = items.iter().map(|(_, count, _)| count).sum();
        let slices = items
            .into_iter()
            .map(|(label, count, color)| PieSlice {
                percent: if total == 0 {
                    0.0
                } else {
                    f64::from(count) * 100.0 / f64::from(total)
                },
                label,
                count,
                color,
            })
            .collect();
        Self { slices }
    }

    pub fn is_empty(&self) -> bool {
        self.slices.iter().all(|s| s.count == 0)
    }

    /// CSS `conic-gradient` drawing the slices in order.
    pub fn gradient(&self) -> String {
        let mut start = 0.0;
        let stops: Vec<String> = self
            .slices
            .iter()
            .filter(|s| s.count > 0)
            .map(|s| {
                let end = start + s.percent;
                let stop = format!("{} {:.2}% {:.2}%", s.color, start, end);
                start = end;
                stop
            })
            .collect();
        if stops.is_empty() {
            return "none".to_string();
        }
        format!("conic-gradient({})", stops.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudWord {
    pub text: String,
    pub font_px: u32,
}

impl CloudWord {
    fn from_weight(word: &WordWeight) -> Self {
        Self {
            text: word.text.clone(),
            font_px: word.value.saturating_mul(2).saturating_add(12),
        }
    }
}

/// Word cloud with every stop-listed token removed.
pub fn filtered_word_cloud(words: &[WordWeight]) -> Vec<CloudWord> {
    words
        .iter()
        .filter(|w| !STOP_WORDS.contains(&w.text.as_str()))
        .map(CloudWord::from_weight)
        .collect()
}

pub fn word_cloud(words: &[WordWeight]) -> Vec<CloudWord> {
    words.iter().map(CloudWord::from_weight).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NegativePanel {
    pub summary: String,
    pub pie: Option<PieChart>,
    pub empty_chart_message: Option<&'static str>,
    pub cloud: Vec<CloudWord>,
}

impl NegativePanel {
    pub fn from_insights(insights: &NegativeInsights) -> Self {
        let summary = format!(
            "Number of days with negative words: {} / {} ({}%)",
            insights.negative_count, insights.total_entries, insights.negative_ratio
        );

        let pie = PieChart::new(
            insights
                .top_negative_words
                .iter()
                .zip(PIE_COLORS)
                .map(|(w, color)| (w.keyword.clone(), w.count, color)),
        );
        let (pie, empty_chart_message) = if pie.slices.is_empty() {
            (None, Some(NO_NEGATIVE_WORDS))
        } else {
            (Some(pie), None)
        };

        Self {
            summary,
            pie,
            empty_chart_message,
            cloud: filtered_word_cloud(&insights.wordcloud),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub date: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPanel {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub empty_message: Option<&'static str>,
    pub cloud: Vec<CloudWord>,
}

impl SearchPanel {
    pub fn from_results(query: &str, results: &SearchResults) -> Self {
        let hits: Vec<SearchHit> = results
            .entries
            .iter()
            .map(|e| SearchHit {
                date: e.date.clone(),
                content: e.content.clone(),
            })
            .collect();
        Self {
            query: query.to_string(),
            empty_message: hits.is_empty().then_some(NO_SEARCH_RESULTS),
            hits,
            cloud: word_cloud(&results.wordcloud),
        }
    }
}

pub fn sentiment_pie(overview: &SentimentOverview) -> PieChart {
    PieChart::new([
        ("Positive".to_string(), overview.positive, SENTIMENT_COLORS[0]),
        ("Neutral".to_string(), overview.neutral, SENTIMENT_COLORS[1]),
        ("Negative".to_string(), overview.negative, SENTIMENT_COLORS[2]),
    ])
}

/// Loosely typed payloads (stress analysis, entry insights) as label/value rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailsPanel {
    pub title: String,
    pub rows: Vec<(String, String)>,
}

impl DetailsPanel {
    pub fn from_value(title: impl Into<String>, value: &serde_json::Value) -> Self {
        fn show(value: &serde_json::Value) -> String {
            match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Array(items) => {
                    items.iter().map(show).collect::<Vec<_>>().join(", ")
                }
                other => other.to_string(),
            }
        }

        let rows = match value {
            serde_json::Value::Object(map) => map
                .iter()
                .map(|(key, v)| (key.replace('_', " "), show(v)))
                .collect(),
            serde_json::Value::Null => Vec::new(),
            other => vec![("value".to_string(), show(other))],
        };
        Self {
            title: title.into(),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardView {
    pub tab: Tab,
    pub period: Period,
    pub signed_in: bool,
    pub frequency: Option<FrequencyChart>,
    pub sentiment: Option<PieChart>,
    pub negative: Option<NegativePanel>,
    pub search: Option<SearchPanel>,
    pub details: Option<DetailsPanel>,
    pub message: Option<&'static str>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct DashboardState {
    tab: Tab,
    period: Period,
}

pub struct Dashboard {
    backend: Arc<dyn DiaryBackend>,
    users: UserStore,
    state: Mutex<DashboardState>,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn DiaryBackend>, users: UserStore) -> Self {
        Self {
            backend,
            users,
            state: Mutex::new(DashboardState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tab(&self) -> Tab {
        self.state().tab
    }

    pub fn period(&self) -> Period {
        self.state().period
    }

    /// Reload whatever tab is open.
    pub async fn current(&self) -> DashboardView {
        let DashboardState { tab, period } = *self.state();
        self.load(tab, period).await
    }

    pub async fn switch_tab(&self, tab: Tab) -> DashboardView {
        let period = {
            let mut state = self.state();
            state.tab = tab;
            state.period
        };
        tracing::debug!(tab = tab.as_str(), "dashboard tab switched");
        self.load(tab, period).await
    }

    /// Change the frequency chart's period; this also brings its tab forward.
    pub async fn set_period(&self, period: Period) -> DashboardView {
        {
            let mut state = self.state();
            state.tab = Tab::Frequency;
            state.period = period;
        }
        self.load(Tab::Frequency, period).await
    }

    pub async fn search(&self, query: &str) -> DashboardView {
        let mut view = self.switch_tab(Tab::Search).await;
        if !view.signed_in {
            return view;
        }

        let query = query.trim();
        if query.is_empty() {
            view.message = Some(EMPTY_QUERY);
            return view;
        }

        let Some(user) = self.users.load().await else {
            return view;
        };
        match self.backend.search_entries(&user, query).await {
            Ok(results) => view.search = Some(SearchPanel::from_results(query, &results)),
            Err(e) => {
                tracing::error!("Search failed: {e}");
                view.error = Some(format!("Error: {e}"));
            }
        }
        view
    }

    pub async fn entry_insights(&self, entry_id: &str) -> DashboardView {
        let mut view = self.switch_tab(Tab::Insights).await;
        let Some(user) = self.users.load().await else {
            return view;
        };
        match self.backend.entry_insights(&user, entry_id).await {
            Ok(value) => view.details = Some(DetailsPanel::from_value("Entry insights", &value)),
            Err(e) => {
                tracing::error!(entry_id, "Failed to load insights: {e}");
                view.error = Some(format!("Error: {e}"));
            }
        }
        view
    }

    async fn load(&self, tab: Tab, period: Period) -> DashboardView {
        let mut view = DashboardView {
            tab,
            period,
            ..DashboardView::default()
        };
        let Some(user) = self.users.load().await else {
            return view;
        };
        view.signed_in = true;

        match tab {
            Tab::Frequency => match self.backend.emotion_stats(&user, period).await {
                Ok(data) => view.frequency = Some(FrequencyChart::from_data(&data, period)),
                Err(e) => {
                    tracing::error!(period = period.as_str(), "Error rendering frequency chart: {e}");
                    view.error = Some(format!("Error loading chart: {e}"));
                }
            },
            Tab::Sentiment => match self.backend.sentiment_overview(&user).await {
                Ok(overview) => view.sentiment = Some(sentiment_pie(&overview)),
                Err(e) => self.panel_error(&mut view, "sentiment overview", e),
            },
            Tab::Stress => match self.backend.stress_analysis(&user).await {
                Ok(value) => view.details = Some(DetailsPanel::from_value("Stress analysis", &value)),
                Err(e) => self.panel_error(&mut view, "stress analysis", e),
            },
            Tab::Search | Tab::Insights => self.load_negative(&user, &mut view).await,
        }
        view
    }

    async fn load_negative(&self, user: &AuthUser, view: &mut DashboardView) {
        match self.backend.negative_insights(user).await {
            Ok(insights) => view.negative = Some(NegativePanel::from_insights(&insights)),
            Err(e) => self.panel_error(view, "negative insights", e),
        }
    }

    fn panel_error(&self, view: &mut DashboardView, what: &str, e: ApiError) {
        tracing::error!("Error loading {what}: {e}");
        view.error = Some(format!("Error: {e}"));
    }
}
