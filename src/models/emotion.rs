use serde::{Deserialize, Serialize};

pub const POSITIVE_COLOR: &str = "#b7e7e1";
pub const NEUTRAL_COLOR: &str = "#ffe9b0";
pub const NEGATIVE_COLOR: &str = "#f7b7b7";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Lenient parse; the backend may hand back an empty or unknown value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    /// Calendar cell background.
    pub fn color(self) -> &'static str {
        match self {
            Sentiment::Positive => POSITIVE_COLOR,
            Sentiment::Neutral => NEUTRAL_COLOR,
            Sentiment::Negative => NEGATIVE_COLOR,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

/// One row of `GET /emotions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionRecord {
    #[serde(default)]
    pub entry_id: String,
    #[serde(default)]
    pub sentiment: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub date: Option<String>,
}

/// What the calendar shows for a single date key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmotionMark {
    pub sentiment: Option<Sentiment>,
    pub icon: Option<String>,
}

impl EmotionMark {
    pub fn background(&self) -> &'static str {
        self.sentiment.map(Sentiment::color).unwrap_or(NEUTRAL_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_parse_is_lenient() {
        assert_eq!(Sentiment::parse("Negative"), Some(Sentiment::Negative));
        assert_eq!(Sentiment::parse(" positive "), Some(Sentiment::Positive));
        assert_eq!(Sentiment::parse(""), None);
        assert_eq!(Sentiment::parse("meh"), None);
    }

    #[test]
    fn unknown_sentiment_falls_back_to_neutral_color() {
        let mark = EmotionMark {
            sentiment: None,
            icon: None,
        };
        assert_eq!(mark.background(), NEUTRAL_COLOR);
        assert_eq!(Sentiment::Negative.color(), "#f7b7b7");
    }

    #[test]
    fn emotion_record_tolerates_missing_fields() {
        let record: EmotionRecord = serde_json::from_str(r#"{"entry_id":"e1"}"#).unwrap();
        assert_eq!(record.entry_id, "e1");
        assert!(record.sentiment.is_empty());
        assert!(record.date.is_none());
    }
}
