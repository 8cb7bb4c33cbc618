use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;

use crate::models::AuthUser;
use crate::AppState;

const USER_KEY: &str = "user";

/// Local storage for the authenticated-user object.
///
/// The value is read on every data operation; a missing or unparsable value
/// means "signed out" and callers skip their network calls.
#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn load(&self) -> Option<AuthUser> {
        let row: Option<(String,)> =
            match sqlx::query_as("SELECT value FROM local_storage WHERE key = ?")
                .bind(USER_KEY)
                .fetch_optional(&self.db)
                .await
            {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!("Failed to read stored user: {e}");
                    None
                }
            };

        let (value,) = row?;
        serde_json::from_str::<AuthUser>(&value)
            .ok()
            .filter(AuthUser::is_valid)
    }

    pub async fn save(&self, user: &AuthUser) -> Result<(), sqlx::Error> {
        let value = serde_json::to_string(user).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(USER_KEY)
        .bind(&value)
        .bind(&now)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn clear(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM local_storage WHERE key = ?")
            .bind(USER_KEY)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Extractor for pages that need a stored user.
pub struct SignedIn(pub AuthUser);

impl FromRequestParts<AppState> for SignedIn {
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state.users.load().await.map(SignedIn).ok_or(AuthRedirect)
    }
}

pub struct AuthRedirect;

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        Redirect::to("/login").into_response()
    }
}
