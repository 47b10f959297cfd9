use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use super::{dto::SessionRequest, password::CredentialHasher, repo_types::User};
use crate::{
    config::{SessionConfig, MIN_SESSION_ID_BYTES},
    error::{AppError, Result},
};

/// Verifies a `SessionRequest` and mints the session id that replaces any
/// prior one for that user.
#[derive(Clone)]
pub struct SessionIssuer {
    hasher: Arc<dyn CredentialHasher>,
    id_bytes: usize,
    // Verified against when the email is unknown, so both failure paths do
    // the same work.
    decoy_hash: Arc<str>,
}

impl SessionIssuer {
    pub fn new(hasher: Arc<dyn CredentialHasher>, cfg: SessionConfig) -> Result<Self> {
        let mut decoy = Zeroizing::new([0u8; 24]);
        OsRng
            .try_fill_bytes(&mut decoy[..])
            .map_err(|e| AppError::Randomness(e.to_string()))?;
        let decoy_hash = hasher.hash(&URL_SAFE_NO_PAD.encode(&decoy[..]))?;

        Ok(Self {
            hasher,
            id_bytes: cfg.id_bytes.max(MIN_SESSION_ID_BYTES),
            decoy_hash: decoy_hash.into(),
        })
    }

    pub fn issue_session<F>(&self, req: &SessionRequest, lookup: F) -> Result<String>
    where
        F: FnOnce(&str) -> Option<User>,
    {
        self.issue_session_with_rng(req, lookup, &mut OsRng)
    }

    pub fn issue_session_with_rng<F, R>(
        &self,
        req: &SessionRequest,
        lookup: F,
        rng: &mut R,
    ) -> Result<String>
    where
        F: FnOnce(&str) -> Option<User>,
        R: RngCore + CryptoRng,
    {
        let Some(user) = lookup(&req.email) else {
            // Result discarded; only the cost matters.
            let _ = self.hasher.verify(&req.password, &self.decoy_hash);
            warn!(email = %req.email, "login unknown email");
            return Err(AppError::Authentication);
        };

        let matched = match self.hasher.verify(&req.password, &user.hashed_password) {
            Ok(v) => v,
            Err(e) => {
                error!(email = %user.email, error = %e, "stored password hash unusable");
                return Err(AppError::Authentication);
            }
        };
        if !matched {
            warn!(email = %user.email, "login invalid password");
            return Err(AppError::Authentication);
        }

        let session_id = generate_session_id(rng, self.id_bytes)?;
        info!(email = %user.email, "session issued");
        Ok(session_id)
    }
}

/// `len` bytes from `rng`, URL-safe base64 without padding.
pub fn generate_session_id<R>(rng: &mut R, len: usize) -> Result<String>
where
    R: RngCore + CryptoRng,
{
    let mut bytes = Zeroizing::new(vec![0u8; len]);
    rng.try_fill_bytes(&mut bytes).map_err(|e| {
        error!(error = %e, "secure random source failed");
        AppError::Randomness(e.to_string())
    })?;
    debug!(len, "session id generated");
    Ok(URL_SAFE_NO_PAD.encode(bytes.as_slice()))
}
