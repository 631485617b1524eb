//! Process configuration loaded from the environment.

use chrono::Duration;

/// Signing secret used only for local development.
///
/// Production deployments must set `JWT_SECRET`; startup fails otherwise.
const DEV_SECRET: &str = "dev-secret";

const DEFAULT_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_SWEEP_SECS: u64 = 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET is not set (set APP_ENV=development to use the insecure dev default)")]
    MissingSecret,
    #[error("invalid value for {var}: {message}")]
    Invalid {
        var: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub signing_secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub bind_addr: String,
    /// Postgres connection string; in-memory stores are used when absent.
    pub database_url: Option<String>,
    pub sweep_interval: std::time::Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let signing_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                let app_env = std::env::var("APP_ENV").unwrap_or_default();
                if app_env != "development" {
                    return Err(ConfigError::MissingSecret);
                }
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_SECRET.to_string()
            }
        };

        let ttl_secs = parse_env("JWT_TTL_SECS", DEFAULT_TTL_SECS)?;
        if ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "JWT_TTL_SECS",
                message: "must be positive".to_string(),
            });
        }

        Ok(Self {
            signing_secret,
            token_ttl: Duration::seconds(ttl_secs),
            bcrypt_cost: parse_env("BCRYPT_COST", doorman_store::DEFAULT_BCRYPT_COST)?,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            sweep_interval: std::time::Duration::from_secs(parse_env(
                "SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_SECS,
            )?),
        })
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
