use std::sync::Arc;

use anyhow::Context;
use seats::SeatRepository;
use seats::db::Db;
use seats::repository_memory::MemorySeatRepository;
use seats::repository_sqlx::SqlxSeatRepository;
use tracing::info;

use crate::config::{AppConfig, MEMORY_STORE_URL};

/// Opens the configured store, runs migrations, and provisions the seat pool.
///
/// Provisioning is idempotent: restarting against an existing database keeps
/// every reservation already made.
pub async fn init_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn SeatRepository>> {
    let repo: Arc<dyn SeatRepository> = if cfg.database_url == MEMORY_STORE_URL {
        info!(action = "main", status = "memory_store", "using in-process seat store");
        Arc::new(MemorySeatRepository::new())
    } else {
        let db = Db::connect_with_retry(&cfg.database_url, &cfg.pool, &cfg.connect_retry).await?;
        db.migrate().await.context("schema migration failed")?;
        Arc::new(SqlxSeatRepository::new(db))
    };

    let inserted = repo
        .initialize(cfg.total_seats)
        .await
        .context("seat initialization failed")?;

    info!(
        action = "init_seats",
        status = %format!("inserted_up_to={}", cfg.total_seats),
        inserted,
        "seat pool ready"
    );

    Ok(repo)
}
