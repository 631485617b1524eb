//! Service wiring: token service plus user/revocation stores.
//!
//! `DATABASE_URL` selects the Postgres-backed stores; without it everything
//! runs in memory, which is what the black-box tests use.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;

use doorman_auth::{CredentialStore, RevocationStore, TokenService};
use doorman_store::{
    ensure_schema, InMemoryRevocationStore, InMemoryUserStore, PgRevocationStore, PgUserStore,
    UserStore,
};

use crate::config::AppConfig;

pub struct AppServices {
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserStore>,
    pub bcrypt_cost: u32,
}

impl AppServices {
    /// Wire everything against in-memory stores.
    pub fn in_memory(secret: &str, ttl: Duration, bcrypt_cost: u32) -> Self {
        let users = Arc::new(InMemoryUserStore::new());
        let revocations = Arc::new(InMemoryRevocationStore::new());

        let credentials: Arc<dyn CredentialStore> = users.clone();
        let revocations: Arc<dyn RevocationStore> = revocations;

        Self {
            tokens: Arc::new(TokenService::new(
                secret.as_bytes(),
                ttl,
                credentials,
                revocations,
            )),
            users,
            bcrypt_cost,
        }
    }

    async fn postgres(config: &AppConfig, url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        ensure_schema(&pool).await?;

        let users = Arc::new(PgUserStore::new(pool.clone()));
        let revocations: Arc<dyn RevocationStore> = Arc::new(PgRevocationStore::new(pool));
        let credentials: Arc<dyn CredentialStore> = users.clone();

        Ok(Self {
            tokens: Arc::new(TokenService::new(
                config.signing_secret.as_bytes(),
                config.token_ttl,
                credentials,
                revocations,
            )),
            users,
            bcrypt_cost: config.bcrypt_cost,
        })
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => {
            tracing::info!("using postgres-backed stores");
            AppServices::postgres(config, url).await
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory stores");
            Ok(AppServices::in_memory(
                &config.signing_secret,
                config.token_ttl,
                config.bcrypt_cost,
            ))
        }
    }
}

/// Periodically drop revocation entries whose tokens have expired anyway.
pub fn spawn_revocation_sweeper(services: Arc<AppServices>, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = services.tokens.sweep_expired(Utc::now()).await {
                tracing::warn!(error = %e, "revocation sweep failed");
            }
        }
    });
}
