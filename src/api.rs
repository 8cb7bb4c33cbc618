//! Client for the diary backend.
//!
//! The backend owns persistence, authentication and sentiment analysis; this
//! module only speaks its REST+JSON dialect. Everything above it goes through
//! the [`DiaryBackend`] trait so the state logic can run against an
//! in-process fake.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::models::{
    AuthUser, ChartData, Credentials, EmotionRecord, Entry, EntryDraft, NegativeInsights, Period,
    SearchResults, SentimentOverview,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("{}", status_display(*code, body))]
    Status { code: u16, body: String },
    #[error("invalid response: {0}")]
    Parse(String),
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { code: 401, .. })
    }
}

/// The backend reports failures as `{"error": "..."}`; fall back to the
/// raw body when it doesn't.
fn status_display(code: u16, body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        format!("HTTP {code}")
    } else {
        format!("HTTP {code}: {message}")
    }
}

#[async_trait]
pub trait DiaryBackend: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthUser, ApiError>;
    async fn register(&self, credentials: &Credentials) -> Result<(), ApiError>;

    async fn list_entries(&self, user: &AuthUser) -> Result<Vec<Entry>, ApiError>;
    async fn create_entry(&self, user: &AuthUser, draft: &EntryDraft) -> Result<Entry, ApiError>;
    async fn update_entry(
        &self,
        user: &AuthUser,
        id: &str,
        draft: &EntryDraft,
    ) -> Result<Entry, ApiError>;
    async fn delete_entry(&self, user: &AuthUser, id: &str) -> Result<(), ApiError>;

    async fn list_emotions(&self, user: &AuthUser) -> Result<Vec<EmotionRecord>, ApiError>;
    async fn emotion_stats(&self, user: &AuthUser, period: Period) -> Result<ChartData, ApiError>;
    async fn search_entries(&self, user: &AuthUser, query: &str)
        -> Result<SearchResults, ApiError>;
    async fn negative_insights(&self, user: &AuthUser) -> Result<NegativeInsights, ApiError>;
    async fn sentiment_overview(&self, user: &AuthUser) -> Result<SentimentOverview, ApiError>;
    async fn stress_analysis(&self, user: &AuthUser) -> Result<serde_json::Value, ApiError>;
    async fn entry_insights(
        &self,
        user: &AuthUser,
        entry_id: &str,
    ) -> Result<serde_json::Value, ApiError>;
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    user_id: String,
    #[serde(default)]
    username: Option<String>,
}

/// reqwest-backed [`DiaryBackend`].
#[derive(Clone)]
pub struct HttpBackend {
    base_url: Url,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|_| ApiError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            client: Client::new(),
        })
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn authed(&self, request: RequestBuilder, user: &AuthUser) -> RequestBuilder {
        request.bearer_auth(&user.token)
    }

    async fn checked(request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), "backend returned an error status");
            return Err(ApiError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        Self::checked(request)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        user: &AuthUser,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments, query)?;
        Self::read_json(self.authed(self.client.get(url), user)).await
    }
}

#[async_trait]
impl DiaryBackend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthUser, ApiError> {
        let url = self.endpoint(&["login"], &[])?;
        let response: LoginResponse =
            Self::read_json(self.client.post(url).json(credentials)).await?;
        Ok(AuthUser {
            user_id: response.user_id,
            token: response.token,
            username: response.username,
        })
    }

    async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let url = self.endpoint(&["register"], &[])?;
        Self::checked(self.client.post(url).json(credentials)).await?;
        Ok(())
    }

    async fn list_entries(&self, user: &AuthUser) -> Result<Vec<Entry>, ApiError> {
        self.get_json(user, &["entries"], &[("user_id", user.user_id.as_str())])
            .await
    }

    async fn create_entry(&self, user: &AuthUser, draft: &EntryDraft) -> Result<Entry, ApiError> {
        let url = self.endpoint(&["entries"], &[])?;
        Self::read_json(self.authed(self.client.post(url), user).json(draft)).await
    }

    async fn update_entry(
        &self,
        user: &AuthUser,
        id: &str,
        draft: &EntryDraft,
    ) -> Result<Entry, ApiError> {
        let url = self.endpoint(&["entries", id], &[])?;
        Self::read_json(self.authed(self.client.put(url), user).json(draft)).await
    }

    async fn delete_entry(&self, user: &AuthUser, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["entries", id], &[("user_id", user.user_id.as_str())])?;
        Self::checked(self.authed(self.client.delete(url), user)).await?;
        Ok(())
    }

    async fn list_emotions(&self, user: &AuthUser) -> Result<Vec<EmotionRecord>, ApiError> {
        self.get_json(user, &["emotions"], &[("user_id", user.user_id.as_str())])
            .await
    }

    async fn emotion_stats(&self, user: &AuthUser, period: Period) -> Result<ChartData, ApiError> {
        self.get_json(user, &["emotions", "stats"], &[("period", period.as_str())])
            .await
    }

    async fn search_entries(
        &self,
        user: &AuthUser,
        query: &str,
    ) -> Result<SearchResults, ApiError> {
        self.get_json(user, &["entries", "search"], &[("q", query)])
            .await
    }

    async fn negative_insights(&self, user: &AuthUser) -> Result<NegativeInsights, ApiError> {
        self.get_json(user, &["entries", "negative-insights"], &[])
            .await
    }

    async fn sentiment_overview(&self, user: &AuthUser) -> Result<SentimentOverview, ApiError> {
        self.get_json(user, &["sentiment-overview"], &[]).await
    }

    async fn stress_analysis(&self, user: &AuthUser) -> Result<serde_json::Value, ApiError> {
        self.get_json(user, &["stress-analysis"], &[]).await
    }

    async fn entry_insights(
        &self,
        user: &AuthUser,
        entry_id: &str,
    ) -> Result<serde_json::Value, ApiError> {
        self.get_json(user, &["insights", entry_id], &[]).await
    }
}
