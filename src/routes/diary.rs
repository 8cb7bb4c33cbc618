use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use crate::auth::SignedIn;
use crate::diary::{DiaryView, DELETE_CONFIRMATION};
use crate::error::AppError;
use crate::form::EntrySubmission;
use crate::AppState;

#[derive(Template)]
#[template(path = "diary.html")]
struct DiaryTemplate {
    view: DiaryView,
    username: Option<String>,
    static_hash: &'static str,
}

#[derive(Template)]
#[template(path = "delete_confirm.html")]
struct DeleteConfirmTemplate {
    id: String,
    question: &'static str,
    username: Option<String>,
    static_hash: &'static str,
}

#[derive(Deserialize)]
pub struct MonthQuery {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    id: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteForm {
    id: Option<String>,
    confirm: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(diary_page))
        .route("/refresh", post(refresh))
        .route("/month", get(show_month))
        .route("/month/previous", post(previous_month))
        .route("/month/next", post(next_month))
        .route("/days/{date}/select", post(select_day))
        .route("/filter/reset", post(reset_filter))
        .route("/entries", post(submit_entry))
        .route("/entries/{id}/edit", post(edit_entry))
        .route("/entries/cancel-edit", post(cancel_edit))
        .route("/entries/delete", get(confirm_delete))
        .route("/entries/delete", post(delete_entry))
}

async fn diary_page(
    State(state): State<AppState>,
    SignedIn(user): SignedIn,
) -> Result<impl IntoResponse, AppError> {
    state.diary.ensure_loaded().await;

    let template = DiaryTemplate {
        view: state.diary.view(),
        username: user.username,
        static_hash: crate::STATIC_HASH,
    };
    Ok(Html(template.render()?))
}

async fn refresh(State(state): State<AppState>, _user: SignedIn) -> impl IntoResponse {
    state.diary.fetch_entries().await;
    Redirect::to("/")
}

async fn show_month(
    State(state): State<AppState>,
    _user: SignedIn,
    Query(query): Query<MonthQuery>,
) -> impl IntoResponse {
    state.diary.show_month(query.year, query.month).await;
    Redirect::to("/")
}

async fn previous_month(State(state): State<AppState>, _user: SignedIn) -> impl IntoResponse {
    state.diary.previous_month().await;
    Redirect::to("/")
}

async fn next_month(State(state): State<AppState>, _user: SignedIn) -> impl IntoResponse {
    state.diary.next_month().await;
    Redirect::to("/")
}

async fn select_day(
    State(state): State<AppState>,
    _user: SignedIn,
    Path(date): Path<String>,
) -> impl IntoResponse {
    state.diary.click_day(&date);
    Redirect::to("/")
}

async fn reset_filter(State(state): State<AppState>, _user: SignedIn) -> impl IntoResponse {
    state.diary.reset_filter();
    Redirect::to("/")
}

async fn submit_entry(
    State(state): State<AppState>,
    _user: SignedIn,
    Form(submission): Form<EntrySubmission>,
) -> impl IntoResponse {
    state.diary.submit(submission).await;
    Redirect::to("/")
}

async fn edit_entry(
    State(state): State<AppState>,
    _user: SignedIn,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.diary.enter_edit(&id) {
        return Err(AppError::NotFound);
    }
    Ok(Redirect::to("/"))
}

async fn cancel_edit(State(state): State<AppState>, _user: SignedIn) -> impl IntoResponse {
    state.diary.exit_edit();
    Redirect::to("/")
}

/// Asks before deleting. Without an id there is nothing to confirm.
async fn confirm_delete(
    State(state): State<AppState>,
    SignedIn(user): SignedIn,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse, AppError> {
    let Some(id) = query.id.filter(|id| !id.trim().is_empty()) else {
        state.diary.delete_entry(None, false).await;
        return Ok(Redirect::to("/").into_response());
    };

    let template = DeleteConfirmTemplate {
        id,
        question: DELETE_CONFIRMATION,
        username: user.username,
        static_hash: crate::STATIC_HASH,
    };
    Ok(Html(template.render()?).into_response())
}

async fn delete_entry(
    State(state): State<AppState>,
    _user: SignedIn,
    Form(form): Form<DeleteForm>,
) -> impl IntoResponse {
    let confirmed = form.confirm.as_deref() == Some("yes");
    state.diary.delete_entry(form.id.as_deref(), confirmed).await;
    Redirect::to("/")
}
