use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::repo_types::User;

/// Credentials presented at login. Held only in memory; wiped on drop.
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SessionRequest {
    pub email: String,
    pub password: String,
}

impl SessionRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for SessionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request body for signup.
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response returned after a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub email: String,
    pub session_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            session_id: user.session_id.clone(),
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_request_debug_hides_password() {
        let req = SessionRequest::new("a@x.com", "secret1");
        let out = format!("{req:?}");
        assert!(out.contains("a@x.com"));
        assert!(!out.contains("secret1"));
    }

    #[test]
    fn zeroize_clears_plaintext() {
        let mut req = SessionRequest::new("a@x.com", "secret1");
        req.zeroize();
        assert!(req.password.is_empty());
        assert!(req.email.is_empty());
    }

    #[test]
    fn public_user_has_no_hash() {
        let user = User {
            email: "a@x.com".into(),
            hashed_password: "$argon2id$secret".into(),
            session_id: Some("sid".into()),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(json.contains("a@x.com"));
        assert!(json.contains("sid"));
        assert!(!json.contains("argon2"));
    }
}
