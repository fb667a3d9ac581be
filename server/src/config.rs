use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use seats::db::{ConnectRetry, PoolSettings};

/// URL that selects the in-process store instead of a database.
pub const MEMORY_STORE_URL: &str = "memory://";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string, or `memory://`.
    pub database_url: String,

    pub bind_addr: SocketAddr,

    /// Seats `1..=total_seats` are provisioned at startup.
    pub total_seats: u32,

    /// Upper bound on ids returned by one listing. `None` returns everything.
    pub max_listed_seats: Option<usize>,

    pub pool: PoolSettings,

    /// Startup wait for the database. Unbounded unless `DB_CONNECT_RETRIES` is set.
    pub connect_retry: ConnectRetry,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; unset keys take defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url =
            get("DATABASE_URL").unwrap_or_else(|| "sqlite://seats_dev.db?mode=rwc".to_string());

        let defaults = PoolSettings::default();

        Ok(Self {
            database_url,
            bind_addr: parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            total_seats: parse_or(&get, "TOTAL_SEATS", 10_000)?,
            max_listed_seats: parse_opt(&get, "MAX_LISTED_SEATS")?,

            pool: PoolSettings {
                max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", defaults.max_connections)?,
                min_connections: parse_or(&get, "DB_MIN_CONNECTIONS", defaults.min_connections)?,
                max_lifetime: Duration::from_secs(parse_or(
                    &get,
                    "DB_CONN_MAX_LIFETIME_SECS",
                    defaults.max_lifetime.as_secs(),
                )?),
                acquire_timeout: Duration::from_secs(parse_or(
                    &get,
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    defaults.acquire_timeout.as_secs(),
                )?),
            },

            connect_retry: ConnectRetry {
                max_attempts: parse_opt(&get, "DB_CONNECT_RETRIES")?,
                delay: Duration::from_secs(parse_or(&get, "DB_CONNECT_RETRY_SECS", 5)?),
            },
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
    }
}
