use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::auth::SignedIn;
use crate::models::Entry;
use crate::AppState;

#[derive(Serialize)]
pub struct ExportData {
    pub exported_at: String,
    pub user_id: String,
    pub entries: Vec<Entry>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/export", get(export_data))
}

async fn export_data(
    State(state): State<AppState>,
    SignedIn(user): SignedIn,
) -> impl IntoResponse {
    state.diary.ensure_fresh().await;

    let export = ExportData {
        exported_at: chrono::Utc::now().to_rfc3339(),
        user_id: user.user_id,
        entries: state.diary.entries(),
    };

    let filename = format!("moodiary-export-{}.json", chrono::Local::now().format("%Y-%m-%d"));
    let content_disposition = format!("attachment; filename=\"{filename}\"");

    (
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        Json(export),
    )
}
