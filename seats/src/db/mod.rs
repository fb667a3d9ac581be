pub mod schema;

use std::time::Duration;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use tracing::{info, warn};

use crate::error::StoreError;

/// SQL flavour behind the pool. Decides how a seat row gets locked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    /// Row locks via `SELECT ... FOR UPDATE`.
    Postgres,
    /// No row locks; the write lock is taken by the guarded update itself.
    Sqlite,
}

impl Dialect {
    pub fn from_url(database_url: &str) -> anyhow::Result<Self> {
        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            Ok(Dialect::Postgres)
        } else if database_url.starts_with("sqlite:") {
            Ok(Dialect::Sqlite)
        } else {
            anyhow::bail!("unsupported database url scheme: {database_url}")
        }
    }
}

#[derive(Clone, Debug)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 100,
            min_connections: 10,
            max_lifetime: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// How long to keep knocking while the database is still coming up.
#[derive(Clone, Debug)]
pub struct ConnectRetry {
    /// `None` waits forever.
    pub max_attempts: Option<u32>,
    pub delay: Duration,
}

impl Default for ConnectRetry {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct Db {
    pub pool: AnyPool,
    pub dialect: Dialect,
}

impl Db {
    pub async fn connect(database_url: &str, settings: &PoolSettings) -> anyhow::Result<Self> {
        sqlx::any::install_default_drivers();

        let dialect = Dialect::from_url(database_url)?;
        let pool = AnyPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections.min(settings.max_connections))
            .max_lifetime(settings.max_lifetime)
            .acquire_timeout(settings.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(StoreError::Connect)?;

        Ok(Self { pool, dialect })
    }

    /// Connects, retrying until the database answers or attempts run out.
    pub async fn connect_with_retry(
        database_url: &str,
        settings: &PoolSettings,
        retry: &ConnectRetry,
    ) -> anyhow::Result<Self> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match Self::connect(database_url, settings).await {
                Ok(db) => {
                    info!(action = "main", status = "db_connected", attempt, "database reachable");
                    return Ok(db);
                }
                Err(e) => {
                    if retry.max_attempts.is_some_and(|max| attempt >= max) {
                        return Err(e.context(format!("database unreachable after {attempt} attempts")));
                    }
                    warn!(
                        action = "main",
                        status = "db_not_reachable",
                        attempt,
                        error = %e,
                        "database not reachable; retrying"
                    );
                    tokio::time::sleep(retry.delay).await;
                }
            }
        }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        schema::migrate(&self.pool).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
