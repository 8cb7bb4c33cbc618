use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::auth::SignedIn;
use crate::dashboard::{DashboardView, Tab};
use crate::error::AppError;
use crate::models::Period;
use crate::AppState;

const PERIODS: [Period; 3] = [Period::Week, Period::Month, Period::Year];

pub struct NavLink {
    pub href: String,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Template)]
#[template(path = "charts.html")]
struct ChartsTemplate {
    view: DashboardView,
    tabs: Vec<NavLink>,
    periods: Vec<NavLink>,
    username: Option<String>,
    static_hash: &'static str,
}

impl ChartsTemplate {
    fn new(view: DashboardView, username: Option<String>) -> Self {
        let tabs = Tab::ALL
            .iter()
            .map(|&tab| NavLink {
                href: format!("/charts?tab={}", tab.as_str()),
                label: tab.label(),
                active: tab == view.tab,
            })
            .collect();
        let periods = PERIODS
            .iter()
            .map(|&period| NavLink {
                href: format!("/charts?period={}", period.as_str()),
                label: period.label(),
                active: period == view.period,
            })
            .collect();
        Self {
            view,
            tabs,
            periods,
            username,
            static_hash: crate::STATIC_HASH,
        }
    }
}

#[derive(Deserialize)]
pub struct ChartsQuery {
    tab: Option<Tab>,
    period: Option<Period>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/charts", get(charts_page))
        .route("/charts/search", get(search))
        .route("/charts/insights/{entry_id}", get(entry_insights))
}

async fn charts_page(
    State(state): State<AppState>,
    SignedIn(user): SignedIn,
    Query(query): Query<ChartsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let view = match (query.period, query.tab) {
        (Some(period), _) => state.dashboard.set_period(period).await,
        (None, Some(tab)) => state.dashboard.switch_tab(tab).await,
        (None, None) => state.dashboard.current().await,
    };
    Ok(Html(ChartsTemplate::new(view, user.username).render()?))
}

async fn search(
    State(state): State<AppState>,
    SignedIn(user): SignedIn,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.dashboard.search(&query.q).await;
    Ok(Html(ChartsTemplate::new(view, user.username).render()?))
}

async fn entry_insights(
    State(state): State<AppState>,
    SignedIn(user): SignedIn,
    Path(entry_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.dashboard.entry_insights(&entry_id).await;
    Ok(Html(ChartsTemplate::new(view, user.username).render()?))
}
