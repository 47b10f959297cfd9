use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::{
    auth::{
        dto::{PublicUser, RegisterRequest, SessionRequest, SessionResponse},
        extractors::SessionUser,
        repo::CreateOutcome,
    },
    error::{AppError, Result},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Argon2 work is CPU-bound; keep it off the async worker threads.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Hashing(format!("blocking task failed: {e}")))?
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/sessions", post(login).delete(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>)> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::InvalidInput("Invalid email"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::InvalidInput("Password too short"));
    }

    // Ensure email is not taken
    if state.store.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let credentials = state.credentials.clone();
    let user =
        run_blocking(move || credentials.create_user(&payload.email, &payload.password)).await?;

    // The check above can lose a race with a concurrent signup.
    if state.store.create(&user).await? == CreateOutcome::EmailTaken {
        warn!(email = %user.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    info!(email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<SessionRequest>,
) -> Result<Json<SessionResponse>> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::InvalidInput("Invalid email"));
    }

    let email = payload.email.clone();
    let found = state.store.find_by_email(&email).await?;
    let user = found.clone();
    let sessions = state.sessions.clone();
    let session_id =
        run_blocking(move || sessions.issue_session(&payload, move |_| found)).await?;

    // Replacing the stored id revokes whatever session the user had before.
    if let Some(user) = user {
        state
            .store
            .save(&user.with_session(session_id.clone()))
            .await?;
    }

    info!(email = %email, "user logged in");
    Ok(Json(SessionResponse { session_id }))
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<StatusCode> {
    let Some(session_id) = user.session_id.as_deref() else {
        return Err(AppError::Unauthenticated);
    };
    // Only the presented session is cleared; a newer login stays valid.
    if state.store.clear_session(&user.email, session_id).await? {
        info!(email = %user.email, "user logged out");
    } else {
        debug!(email = %user.email, "session already replaced");
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(user))]
pub async fn get_me(SessionUser(user): SessionUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}
