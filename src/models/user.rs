use serde::{Deserialize, Serialize};

/// The authenticated-user object kept in local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub token: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl AuthUser {
    /// A stored object is only usable when both halves are present.
    pub fn is_valid(&self) -> bool {
        !self.user_id.trim().is_empty() && !self.token.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}
