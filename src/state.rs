use std::sync::Arc;

use anyhow::Context;

use crate::auth::{
    credentials::CredentialFactory,
    password::{Argon2Hasher, CredentialHasher},
    repo::{MemoryUserStore, PgUserStore, UserStore},
    session::SessionIssuer,
};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub credentials: CredentialFactory,
    pub sessions: SessionIssuer,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let store = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                // The schema carries the email and session id uniqueness.
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory user store");
                Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        let hasher = Arc::new(Argon2Hasher::new(config.hashing)?) as Arc<dyn CredentialHasher>;
        Self::from_parts(&config, store, hasher)
    }

    pub fn from_parts(
        config: &AppConfig,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> anyhow::Result<Self> {
        let credentials = CredentialFactory::new(hasher.clone());
        let sessions = SessionIssuer::new(hasher, config.session)?;
        Ok(Self {
            store,
            credentials,
            sessions,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_store(Arc::new(MemoryUserStore::new()))
    }

    #[cfg(test)]
    pub fn fake_with_store(store: Arc<dyn UserStore>) -> Self {
        use crate::config::{HashingConfig, SessionConfig};

        let config = AppConfig {
            database_url: None,
            hashing: HashingConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            session: SessionConfig::default(),
        };
        let hasher = Arc::new(Argon2Hasher::new(config.hashing).expect("test params"))
            as Arc<dyn CredentialHasher>;
        Self::from_parts(&config, store, hasher).expect("fake state builds")
    }
}
