use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::repo_types::User;
use crate::{error::AppError, state::AppState};

/// Resolves `Authorization: Bearer <session id>` to the owning user.
pub struct SessionUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Unauthenticated)?;

        let session_id = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AppError::Unauthenticated)?;

        let user = state
            .store
            .find_by_session_id(session_id)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        Ok(SessionUser(user))
    }
}
