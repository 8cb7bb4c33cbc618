use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use crate::api::ApiError;
use crate::error::AppError;
use crate::models::Credentials;
use crate::AppState;

const INVALID_LOGIN: &str = "Invalid username or password";
const REGISTERED: &str = "Account created. Please log in.";

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<String>,
    notice: Option<&'static str>,
    username: Option<String>,
    static_hash: &'static str,
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    error: Option<String>,
    username: Option<String>,
    static_hash: &'static str,
}

#[derive(Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

impl CredentialsForm {
    fn into_credentials(self) -> Credentials {
        Credentials {
            username: self.username.trim().to_string(),
            password: self.password,
        }
    }
}

/// Local check before a registration goes to the backend.
fn validate_registration(credentials: &Credentials) -> Option<&'static str> {
    let length = credentials.username.chars().count();
    if !(3..=50).contains(&length) {
        return Some("Username must be between 3 and 50 characters");
    }
    if credentials.password.is_empty() {
        return Some("Password is required");
    }
    None
}

fn login_page_with(error: Option<String>, notice: Option<&'static str>) -> LoginTemplate {
    LoginTemplate {
        error,
        notice,
        username: None,
        static_hash: crate::STATIC_HASH,
    }
}

fn register_page_with(error: Option<String>) -> RegisterTemplate {
    RegisterTemplate {
        error,
        username: None,
        static_hash: crate::STATIC_HASH,
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/login", post(login_submit))
        .route("/register", get(register_page))
        .route("/register", post(register_submit))
        .route("/logout", post(logout))
}

async fn login_page() -> Result<impl IntoResponse, AppError> {
    Ok(Html(login_page_with(None, None).render()?))
}

async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<impl IntoResponse, AppError> {
    let credentials = form.into_credentials();

    match state.backend.login(&credentials).await {
        Ok(user) => {
            state.users.save(&user).await?;
            // Whatever was held belonged to the previous user.
            state.diary.clear();
            tracing::info!(user_id = %user.user_id, "signed in");
            Ok(Redirect::to("/").into_response())
        }
        Err(ApiError::Status { code: 400 | 401, .. }) => {
            let template = login_page_with(Some(INVALID_LOGIN.to_string()), None);
            Ok(Html(template.render()?).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn register_page() -> Result<impl IntoResponse, AppError> {
    Ok(Html(register_page_with(None).render()?))
}

async fn register_submit(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<impl IntoResponse, AppError> {
    let credentials = form.into_credentials();
    if let Some(message) = validate_registration(&credentials) {
        return Ok(Html(register_page_with(Some(message.to_string())).render()?));
    }

    match state.backend.register(&credentials).await {
        Ok(()) => {
            tracing::info!(username = %credentials.username, "registered");
            Ok(Html(login_page_with(None, Some(REGISTERED)).render()?))
        }
        Err(e @ ApiError::Status { .. }) => {
            Ok(Html(register_page_with(Some(e.to_string())).render()?))
        }
        Err(e) => Err(e.into()),
    }
}

async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.users.clear().await?;
    state.diary.clear();
    Ok(Redirect::to("/login"))
}
