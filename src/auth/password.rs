use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, error};
use zeroize::Zeroizing;

use crate::{
    config::HashingConfig,
    error::{AppError, Result},
};

const SALT_BYTES: usize = 16;

/// Slow, salted, one-way password transform.
///
/// Implementations embed the salt and work factor in the returned string so
/// `verify` needs nothing but the stored hash.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String>;
    fn verify(&self, plain: &str, hashed: &str) -> Result<bool>;
}

/// Argon2id with a configurable work factor, producing PHC strings.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(cfg: HashingConfig) -> Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| AppError::Hashing(format!("argon2 params: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String> {
        let password = Zeroizing::new(plain.as_bytes().to_vec());

        let mut salt_bytes = [0u8; SALT_BYTES];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| AppError::Hashing(format!("salt generation: {e}")))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AppError::Hashing(format!("salt encoding: {e}")))?;

        let hash = self
            .argon2()
            .hash_password(&password, &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AppError::Hashing(e.to_string())
            })?
            .to_string();
        debug!("password hashed");
        Ok(hash)
    }

    fn verify(&self, plain: &str, hashed: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hashed).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            AppError::Hashing(e.to_string())
        })?;
        let password = Zeroizing::new(plain.as_bytes().to_vec());
        // Parameters embedded in `parsed` take precedence over ours.
        Ok(self.argon2().verify_password(&password, &parsed).is_ok())
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> Argon2Hasher {
    Argon2Hasher::new(HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("test params are valid")
}
