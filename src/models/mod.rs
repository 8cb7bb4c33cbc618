pub mod emotion;
pub mod entry;
pub mod stats;
pub mod user;

pub use emotion::{EmotionMark, EmotionRecord, Sentiment};
pub use entry::{Entry, EntryDraft};
pub use stats::{
    ChartData, ChartDataset, KeywordCount, NegativeInsights, Period, SearchResults,
    SentimentOverview, WordWeight,
};
pub use user::{AuthUser, Credentials};
