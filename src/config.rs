use anyhow::Context;
use serde::Deserialize;

/// Smallest session id, in random bytes, the service will issue.
pub const MIN_SESSION_ID_BYTES: usize = 16;

/// Argon2 work factor.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    // argon2 crate defaults (OWASP minimum for Argon2id)
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    pub id_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { id_bytes: 32 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub hashing: HashingConfig,
    pub session: SessionConfig,
}

/// `default` when `key` is unset or blank; a value that fails to parse is an error.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid {key}: {v:?}")),
        _ => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let defaults = HashingConfig::default();
        let hashing = HashingConfig {
            memory_kib: env_or("HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: env_or("HASH_ITERATIONS", defaults.iterations)?,
            parallelism: env_or("HASH_PARALLELISM", defaults.parallelism)?,
        };
        if hashing.iterations == 0 || hashing.parallelism == 0 {
            anyhow::bail!("HASH_ITERATIONS and HASH_PARALLELISM must be at least 1");
        }

        let requested = env_or("SESSION_ID_BYTES", SessionConfig::default().id_bytes)?;
        if requested < MIN_SESSION_ID_BYTES {
            tracing::warn!(
                requested,
                minimum = MIN_SESSION_ID_BYTES,
                "SESSION_ID_BYTES too small; using minimum"
            );
        }
        let session = SessionConfig {
            id_bytes: requested.max(MIN_SESSION_ID_BYTES),
        };

        Ok(Self {
            database_url,
            hashing,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test owns its variable names; the test harness runs them in parallel.

    #[test]
    fn env_or_uses_default_when_unset_or_blank() {
        std::env::remove_var("SESSIONKEEP_TEST_UNSET");
        assert_eq!(env_or("SESSIONKEEP_TEST_UNSET", 7u32).unwrap(), 7);

        std::env::set_var("SESSIONKEEP_TEST_BLANK", "  ");
        assert_eq!(env_or("SESSIONKEEP_TEST_BLANK", 7u32).unwrap(), 7);
    }

    #[test]
    fn env_or_parses_set_value() {
        std::env::set_var("SESSIONKEEP_TEST_SET", " 4096 ");
        assert_eq!(env_or("SESSIONKEEP_TEST_SET", 7u32).unwrap(), 4096);
    }

    #[test]
    fn env_or_rejects_malformed_value() {
        std::env::set_var("SESSIONKEEP_TEST_BAD", "abc");
        let err = env_or("SESSIONKEEP_TEST_BAD", 7u32).unwrap_err();
        assert!(err.to_string().contains("SESSIONKEEP_TEST_BAD"));

        std::env::set_var("SESSIONKEEP_TEST_NEGATIVE", "-1");
        assert!(env_or("SESSIONKEEP_TEST_NEGATIVE", 32usize).is_err());
    }
}
