use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::api::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
    #[error("backend error: {0}")]
    Backend(#[from] ApiError),
    #[error("not found")]
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => return (StatusCode::NOT_FOUND, "Not found").into_response(),
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self, "request failed");
        let message = match status {
            StatusCode::BAD_GATEWAY => "Diary backend unavailable",
            _ => "Internal server error",
        };
        (status, message).into_response()
    }
}
