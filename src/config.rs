use std::{fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Base for OAuth redirect URIs.
    pub public_url: String,
    pub session_idle_minutes: i64,
    pub client_secret_path: PathBuf,
    pub seed_sample_data: bool,
}

impl Config {
    /// Reads `.env` if present, then the environment.
    pub fn load() -> AppResult<Config> {
        if dotenv::dotenv().is_err() {
            info!("no .env file, reading the environment only");
        }

        Ok(Config {
            database_url: try_load("DATABASE_URL", "sqlite://alumnet.db?mode=rwc")?,
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:8080")?,
            public_url: try_load::<String>("PUBLIC_URL", "http://localhost:8080")?
                .trim_end_matches('/')
                .to_owned(),
            session_idle_minutes: try_load("SESSION_IDLE_MINUTES", "60")?,
            client_secret_path: try_load("CLIENT_SECRET_PATH", "client_secret.json")?,
            seed_sample_data: try_load("SEED_SAMPLE_DATA", "false")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite::memory:".to_owned(),
            bind_addr: "127.0.0.1:8080".to_owned(),
            public_url: "http://localhost:8080".to_owned(),
            session_idle_minutes: 60,
            client_secret_path: PathBuf::from("client_secret.json"),
            seed_sample_data: false,
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> AppResult<T>
where
    T::Err: Display,
{
    let value = dotenv::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    value.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        AppError::from(format!("environment misconfigured: {key}={value}"))
    })
}
