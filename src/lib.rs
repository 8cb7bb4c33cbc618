pub mod api;
pub mod auth;
pub mod cache;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod diary;
pub mod entry_list;
pub mod error;
pub mod form;
pub mod models;
pub mod notice;
pub mod routes;
pub mod store;

pub const STATIC_HASH: &str = env!("STATIC_HASH");

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue};
use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::{
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::api::DiaryBackend;
use crate::auth::UserStore;
use crate::dashboard::Dashboard;
use crate::diary::Diary;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn DiaryBackend>,
    pub users: UserStore,
    pub diary: Arc<Diary>,
    pub dashboard: Arc<Dashboard>,
}

impl AppState {
    pub fn new(pool: SqlitePool, backend: Arc<dyn DiaryBackend>, cache_ttl: Duration) -> Self {
        let users = UserStore::new(pool);
        Self {
            diary: Arc::new(Diary::new(Arc::clone(&backend), users.clone(), cache_ttl)),
            dashboard: Arc::new(Dashboard::new(Arc::clone(&backend), users.clone())),
            backend,
            users,
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Build the full Axum application router.
///
/// Caller is responsible for running database migrations on `pool` beforehand.
pub fn build_app(pool: SqlitePool, backend: Arc<dyn DiaryBackend>, cache_ttl: Duration) -> Router {
    router(AppState::new(pool, backend, cache_ttl))
}

/// Assemble routes and middleware around an existing state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::auth::router())
        .merge(routes::diary::router())
        .merge(routes::charts::router())
        .merge(routes::export::router())
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("public, max-age=86400"),
                ))
                .service(ServeDir::new("static")),
        )
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
