use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, error};

use super::{password::CredentialHasher, repo_types::User};
use crate::error::{AppError, Result};

/// Turns an email and plaintext password into a new `User` record.
///
/// Format and strength checks belong to the caller. Persisting the result is
/// a separate call to the store.
#[derive(Clone)]
pub struct CredentialFactory {
    hasher: Arc<dyn CredentialHasher>,
}

impl CredentialFactory {
    pub fn new(hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { hasher }
    }

    pub fn create_user(&self, email: &str, plain_password: &str) -> Result<User> {
        if email.is_empty() {
            return Err(AppError::InvalidInput("email must not be empty"));
        }
        if plain_password.is_empty() {
            return Err(AppError::InvalidInput("password must not be empty"));
        }

        let hashed_password = self.hasher.hash(plain_password).map_err(|e| {
            error!(email = %email, error = %e, "credential hashing failed");
            match e {
                AppError::Hashing(_) => e,
                other => AppError::Hashing(other.to_string()),
            }
        })?;

        debug!(email = %email, "credentials created");
        Ok(User {
            email: email.to_string(),
            hashed_password,
            session_id: None,
            created_at: OffsetDateTime::now_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::test_hasher;

    struct BrokenHasher;

    impl CredentialHasher for BrokenHasher {
        fn hash(&self, _plain: &str) -> Result<String> {
            Err(AppError::Hashing("memory allocation failed".into()))
        }
        fn verify(&self, _plain: &str, _hashed: &str) -> Result<bool> {
            Err(AppError::Hashing("memory allocation failed".into()))
        }
    }

    fn factory() -> CredentialFactory {
        CredentialFactory::new(Arc::new(test_hasher()))
    }

    #[test]
    fn creates_user_with_hashed_password() {
        let before = OffsetDateTime::now_utc();
        let user = factory().create_user("a@x.com", "secret1").unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_ne!(user.hashed_password, "secret1");
        assert!(!user.hashed_password.contains("secret1"));
        assert_eq!(user.session_id, None);
        assert!(user.created_at >= before);
        assert!(user.created_at <= OffsetDateTime::now_utc());
    }

    #[test]
    fn created_hash_verifies_only_the_original_password() {
        let hasher = test_hasher();
        let user = factory().create_user("a@x.com", "secret1").unwrap();
        assert!(hasher.verify("secret1", &user.hashed_password).unwrap());
        assert!(!hasher.verify("secret2", &user.hashed_password).unwrap());
        assert!(!hasher.verify("", &user.hashed_password).unwrap());
    }

    #[test]
    fn same_password_yields_distinct_hashes() {
        let f = factory();
        let a = f.create_user("a@x.com", "shared").unwrap();
        let b = f.create_user("b@x.com", "shared").unwrap();
        assert_ne!(a.hashed_password, b.hashed_password);
    }

    #[test]
    fn rejects_empty_inputs() {
        let f = factory();
        assert!(matches!(
            f.create_user("", "secret1"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            f.create_user("a@x.com", ""),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn hashing_failure_returns_no_user() {
        let f = CredentialFactory::new(Arc::new(BrokenHasher));
        let err = f.create_user("a@x.com", "secret1").unwrap_err();
        assert!(matches!(err, AppError::Hashing(_)));
        assert!(!err.to_string().contains("secret1"));
    }
}
