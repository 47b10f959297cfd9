use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::auth::repo_types::User;

/// Result of inserting a new user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A record with this email already exists; nothing was written.
    EmailTaken,
}

/// Persistence for `User` records. Implementations enforce that `email` and a
/// non-empty `session_id` each identify at most one user.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_session_id(&self, session_id: &str) -> anyhow::Result<Option<User>>;
    /// Insert a new user unless the email is taken.
    async fn create(&self, user: &User) -> anyhow::Result<CreateOutcome>;
    /// Insert or replace the record keyed by `user.email`.
    async fn save(&self, user: &User) -> anyhow::Result<()>;
    /// Clear the session of `email` only while it is still `session_id`.
    /// Returns whether anything was cleared.
    async fn clear_session(&self, email: &str, session_id: &str) -> anyhow::Result<bool>;
}

/// Postgres-backed store. Uniqueness lives in `migrations/0001_users.sql`.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT email, hashed_password, session_id, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_session_id(&self, session_id: &str) -> anyhow::Result<Option<User>> {
        if session_id.is_empty() {
            return Ok(None);
        }
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT email, hashed_password, session_id, created_at
            FROM users
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.db)
        .await
        .context("find user by session id")?;
        Ok(user)
    }

    async fn create(&self, user: &User) -> anyhow::Result<CreateOutcome> {
        let res = sqlx::query(
            r#"
            INSERT INTO users (email, hashed_password, session_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(&user.session_id)
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .context("insert user")?;

        if res.rows_affected() == 0 {
            Ok(CreateOutcome::EmailTaken)
        } else {
            Ok(CreateOutcome::Created)
        }
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (email, hashed_password, session_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET hashed_password = EXCLUDED.hashed_password,
                session_id = EXCLUDED.session_id
            "#,
        )
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(&user.session_id)
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .context("save user")?;
        Ok(())
    }

    async fn clear_session(&self, email: &str, session_id: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET session_id = NULL
            WHERE email = $1 AND session_id = $2
            "#,
        )
        .bind(email)
        .bind(session_id)
        .execute(&self.db)
        .await
        .context("clear session")?;
        Ok(res.rows_affected() > 0)
    }
}

/// Process-local store for development and tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn session_taken(users: &HashMap<String, User>, user: &User) -> bool {
        match user.session_id.as_deref() {
            None | Some("") => false,
            Some(sid) => users
                .values()
                .any(|u| u.email != user.email && u.session_id.as_deref() == Some(sid)),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn find_by_session_id(&self, session_id: &str) -> anyhow::Result<Option<User>> {
        if session_id.is_empty() {
            return Ok(None);
        }
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn create(&self, user: &User) -> anyhow::Result<CreateOutcome> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Ok(CreateOutcome::EmailTaken);
        }
        if Self::session_taken(&users, user) {
            anyhow::bail!("session id already in use");
        }
        users.insert(user.email.clone(), user.clone());
        Ok(CreateOutcome::Created)
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        if Self::session_taken(&users, user) {
            anyhow::bail!("session id already in use");
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn clear_session(&self, email: &str, session_id: &str) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(email) {
            Some(u) if !session_id.is_empty() && u.session_id.as_deref() == Some(session_id) => {
                u.session_id = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn user(email: &str, sid: Option<&str>) -> User {
        User {
            email: email.into(),
            hashed_password: "$argon2id$v=19$placeholder".into(),
            session_id: sid.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn create_reports_taken_email_without_overwriting() {
        let store = MemoryUserStore::new();
        let first = user("a@x.com", None);
        assert_eq!(store.create(&first).await.unwrap(), CreateOutcome::Created);

        let mut second = user("a@x.com", None);
        second.hashed_password = "$argon2id$v=19$other".into();
        assert_eq!(
            store.create(&second).await.unwrap(),
            CreateOutcome::EmailTaken
        );
        assert_eq!(
            store.find_by_email("a@x.com").await.unwrap().unwrap().hashed_password,
            first.hashed_password
        );
    }

    #[tokio::test]
    async fn save_replaces_session_and_old_id_stops_resolving() {
        let store = MemoryUserStore::new();
        let u = user("a@x.com", None);
        store.create(&u).await.unwrap();

        store.save(&u.clone().with_session("sid1".into())).await.unwrap();
        assert_eq!(
            store.find_by_session_id("sid1").await.unwrap().map(|u| u.email),
            Some("a@x.com".to_string())
        );

        store.save(&u.with_session("sid2".into())).await.unwrap();
        assert!(store.find_by_session_id("sid1").await.unwrap().is_none());
        assert!(store.find_by_session_id("sid2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn session_id_is_unique_across_users() {
        let store = MemoryUserStore::new();
        store.create(&user("a@x.com", Some("shared"))).await.unwrap();
        store.create(&user("b@x.com", None)).await.unwrap();

        let err = store
            .save(&user("b@x.com", Some("shared")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already in use"));
    }

    #[tokio::test]
    async fn empty_session_id_never_matches() {
        let store = MemoryUserStore::new();
        store.create(&user("a@x.com", Some(""))).await.unwrap();
        store.create(&user("b@x.com", Some(""))).await.unwrap();
        assert!(store.find_by_session_id("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_session_removes_matching_session() {
        let store = MemoryUserStore::new();
        store.create(&user("a@x.com", Some("sid"))).await.unwrap();
        assert!(store.clear_session("a@x.com", "sid").await.unwrap());
        assert!(store.find_by_session_id("sid").await.unwrap().is_none());
        assert_eq!(
            store.find_by_email("a@x.com").await.unwrap().unwrap().session_id,
            None
        );
    }

    #[tokio::test]
    async fn clear_session_keeps_newer_session() {
        let store = MemoryUserStore::new();
        let u = user("a@x.com", None);
        store.create(&u).await.unwrap();
        store.save(&u.clone().with_session("old".into())).await.unwrap();
        // a later login rotated the id before the stale logout arrived
        store.save(&u.with_session("new".into())).await.unwrap();

        assert!(!store.clear_session("a@x.com", "old").await.unwrap());
        assert!(store.find_by_session_id("new").await.unwrap().is_some());
        assert!(!store.clear_session("nobody@x.com", "new").await.unwrap());
        assert!(!store.clear_session("a@x.com", "").await.unwrap());
    }
}
