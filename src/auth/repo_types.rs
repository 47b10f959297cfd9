use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Credential record. Email is the identity key; the storage layer owns the
/// uniqueness of `email` and `session_id`.
#[derive(Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String, // Argon2 PHC string, never exposed
    pub session_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// Record carrying a freshly issued session id, replacing any prior one.
    pub fn with_session(self, session_id: String) -> Self {
        Self {
            session_id: Some(session_id),
            ..self
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("email", &self.email)
            .field("hashed_password", &"<redacted>")
            .field("session_id", &self.session_id.as_ref().map(|_| "<set>"))
            .field("created_at", &self.created_at)
            .finish()
    }
}
