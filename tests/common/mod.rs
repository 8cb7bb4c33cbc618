use std::collections::{HashSet, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use moodiary::api::{ApiError, DiaryBackend};
use moodiary::auth::UserStore;
use moodiary::models::{
    AuthUser, ChartData, Credentials, EmotionRecord, Entry, EntryDraft, NegativeInsights, Period,
    SearchResults, SentimentOverview,
};
use moodiary::AppState;

pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create in-memory SQLite pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub fn test_user() -> AuthUser {
    AuthUser {
        user_id: "u1".to_string(),
        token: "token-u1".to_string(),
        username: Some("alice".to_string()),
    }
}

pub fn entry(id: &str, date: &str, content: &str, emotions: &[&str]) -> Entry {
    Entry {
        id: Some(id.to_string()),
        date: date.to_string(),
        content: content.to_string(),
        emotions: emotions.iter().map(|e| e.to_string()).collect(),
        user_id: "u1".to_string(),
    }
}

pub fn emotion(entry_id: &str, date: &str, sentiment: &str, icon: &str) -> EmotionRecord {
    EmotionRecord {
        entry_id: entry_id.to_string(),
        sentiment: sentiment.to_string(),
        icon: icon.to_string(),
        date: Some(date.to_string()),
    }
}

/// In-process stand-in for the diary backend. Records every call and the
/// JSON body of every draft it receives.
#[derive(Default)]
pub struct FakeBackend {
    pub entries: Mutex<Vec<Entry>>,
    pub emotions: Mutex<Vec<EmotionRecord>>,
    pub stats: Mutex<ChartData>,
    pub negative: Mutex<NegativeInsights>,
    pub search: Mutex<SearchResults>,
    pub overview: Mutex<SentimentOverview>,
    pub stress: Mutex<serde_json::Value>,
    calls: Mutex<Vec<String>>,
    sent_drafts: Mutex<Vec<serde_json::Value>>,
    emotion_delays: Mutex<VecDeque<Duration>>,
    failing: Mutex<HashSet<&'static str>>,
    next_id: AtomicU64,
}

impl FakeBackend {
    pub fn with_entries(entries: Vec<Entry>) -> Self {
        let backend = Self::default();
        *backend.entries.lock().unwrap() = entries;
        backend
    }

    pub fn set_emotions(&self, records: Vec<EmotionRecord>) {
        *self.emotions.lock().unwrap() = records;
    }

    /// Delay the next `list_emotions` calls, in call order.
    pub fn delay_emotions(&self, delays: &[Duration]) {
        self.emotion_delays.lock().unwrap().extend(delays);
    }

    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn sent_drafts(&self) -> Vec<serde_json::Value> {
        self.sent_drafts.lock().unwrap().clone()
    }

    pub fn stored_entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(method.to_string());
        if self.failing.lock().unwrap().contains(method) {
            return Err(ApiError::Status {
                code: 500,
                body: r#"{"error":"boom"}"#.to_string(),
            });
        }
        Ok(())
    }

    fn remember_draft(&self, draft: &EntryDraft) {
        let json = serde_json::to_value(draft).unwrap();
        self.sent_drafts.lock().unwrap().push(json);
    }
}

#[async_trait]
impl DiaryBackend for FakeBackend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthUser, ApiError> {
        self.record("login")?;
        if credentials.password != "secret" {
            return Err(ApiError::Status {
                code: 401,
                body: r#"{"error":"Invalid credentials"}"#.to_string(),
            });
        }
        Ok(AuthUser {
            username: Some(credentials.username.clone()),
            ..test_user()
        })
    }

    async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.record("register")?;
        if credentials.username == "taken" {
            return Err(ApiError::Status {
                code: 400,
                body: r#"{"error":"Username already exists"}"#.to_string(),
            });
        }
        Ok(())
    }

    async fn list_entries(&self, _user: &AuthUser) -> Result<Vec<Entry>, ApiError> {
        self.record("list_entries")?;
        Ok(self.stored_entries())
    }

    async fn create_entry(&self, user: &AuthUser, draft: &EntryDraft) -> Result<Entry, ApiError> {
        self.record("create_entry")?;
        self.remember_draft(draft);
        let id = format!("new{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let created = Entry {
            id: Some(id),
            date: draft.date.clone(),
            content: draft.content.clone(),
            emotions: draft.emotions.clone(),
            user_id: user.user_id.clone(),
        };
        self.entries.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_entry(
        &self,
        user: &AuthUser,
        id: &str,
        draft: &EntryDraft,
    ) -> Result<Entry, ApiError> {
        self.record("update_entry")?;
        self.remember_draft(draft);
        let updated = Entry {
            id: Some(id.to_string()),
            date: draft.date.clone(),
            content: draft.content.clone(),
            emotions: draft.emotions.clone(),
            user_id: user.user_id.clone(),
        };
        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|e| e.id.as_deref() == Some(id)) {
            Some(slot) => *slot = updated.clone(),
            None => {
                return Err(ApiError::Status {
                    code: 404,
                    body: r#"{"error":"Entry not found"}"#.to_string(),
                })
            }
        }
        Ok(updated)
    }

    async fn delete_entry(&self, _user: &AuthUser, id: &str) -> Result<(), ApiError> {
        self.record("delete_entry")?;
        self.entries
            .lock()
            .unwrap()
            .retain(|e| e.id.as_deref() != Some(id));
        Ok(())
    }

    async fn list_emotions(&self, _user: &AuthUser) -> Result<Vec<EmotionRecord>, ApiError> {
        let delay = self.emotion_delays.lock().unwrap().pop_front();
        self.record("list_emotions")?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.emotions.lock().unwrap().clone())
    }

    async fn emotion_stats(&self, _user: &AuthUser, period: Period) -> Result<ChartData, ApiError> {
        self.record("emotion_stats")?;
        self.calls
            .lock()
            .unwrap()
            .push(format!("period:{}", period.as_str()));
        Ok(self.stats.lock().unwrap().clone())
    }

    async fn search_entries(
        &self,
        _user: &AuthUser,
        query: &str,
    ) -> Result<SearchResults, ApiError> {
        self.record("search_entries")?;
        self.calls.lock().unwrap().push(format!("q:{query}"));
        Ok(self.search.lock().unwrap().clone())
    }

    async fn negative_insights(&self, _user: &AuthUser) -> Result<NegativeInsights, ApiError> {
        self.record("negative_insights")?;
        Ok(self.negative.lock().unwrap().clone())
    }

    async fn sentiment_overview(&self, _user: &AuthUser) -> Result<SentimentOverview, ApiError> {
        self.record("sentiment_overview")?;
        Ok(self.overview.lock().unwrap().clone())
    }

    async fn stress_analysis(&self, _user: &AuthUser) -> Result<serde_json::Value, ApiError> {
        self.record("stress_analysis")?;
        Ok(self.stress.lock().unwrap().clone())
    }

    async fn entry_insights(
        &self,
        _user: &AuthUser,
        entry_id: &str,
    ) -> Result<serde_json::Value, ApiError> {
        self.record("entry_insights")?;
        Ok(serde_json::json!({ "entry_id": entry_id, "sentiment": "negative" }))
    }
}

/// A user store over a fresh database, already holding [`test_user`].
pub async fn signed_in_store() -> UserStore {
    let users = UserStore::new(test_pool().await);
    users.save(&test_user()).await.unwrap();
    users
}

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub state: AppState,
    pub backend: Arc<FakeBackend>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_backend(FakeBackend::default()).await
    }

    pub async fn with_backend(backend: FakeBackend) -> Self {
        Self::with_cache_ttl(backend, Duration::from_secs(60)).await
    }

    pub async fn with_cache_ttl(backend: FakeBackend, cache_ttl: Duration) -> Self {
        let pool = test_pool().await;
        let backend = Arc::new(backend);
        let dyn_backend: Arc<dyn DiaryBackend> = backend.clone();
        let state = AppState::new(pool.clone(), dyn_backend, cache_ttl);
        let router = moodiary::router(state.clone());

        Self {
            router,
            db: pool,
            state,
            backend,
        }
    }

    /// Put the test user into local storage without going through /login.
    pub async fn sign_in(&self) {
        self.state.users.save(&test_user()).await.unwrap();
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.request(req).await
    }

    pub async fn post_form(&self, uri: &str, body: &str) -> Response {
        let req = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.request(req).await
    }
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Assert that a response is a redirect to the given location.
pub fn assert_redirect(resp: &Response, expected_location: &str) {
    assert!(
        resp.status().is_redirection(),
        "Expected redirect, got {}",
        resp.status()
    );
    let location = resp
        .headers()
        .get("location")
        .expect("Redirect should have location header")
        .to_str()
        .unwrap();
    assert_eq!(location, expected_location);
}
