use std::{env, fmt::Display, net::SocketAddr, str::FromStr, time::Duration};

use crate::error::{config_error, Error};
use crate::retry::RetryPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Absent means the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub retry_max: u32,
    pub retry_initial_ms: u64,
    pub retry_max_ms: u64,
}

impl Config {
    /// Reads the process environment, after loading `.env` when present.
    pub fn load() -> Result<Self, Error> {
        if dotenv::dotenv().is_err() {
            tracing::debug!("no .env file loaded");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            bind_addr: try_load(&lookup, "BIND_ADDR", "127.0.0.1:3000")?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            max_connections: try_load(&lookup, "MAX_CONNECTIONS", "5")?,
            retry_max: try_load(&lookup, "RETRY_MAX", "3")?,
            retry_initial_ms: try_load(&lookup, "RETRY_INITIAL_MS", "100")?,
            retry_max_ms: try_load(&lookup, "RETRY_MAX_MS", "5000")?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max,
            initial_delay: Duration::from_millis(self.retry_initial_ms),
            max_delay: Duration::from_millis(self.retry_max_ms),
            ..RetryPolicy::default()
        }
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| {
            tracing::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            tracing::warn!("invalid {key} value: {e}");
            config_error(key)
        })
}
