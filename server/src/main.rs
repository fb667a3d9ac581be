use std::sync::Arc;

use anyhow::Context;
use common::logger::{LogOptions, init_logger};
use server::{
    bootstrap::init_store,
    config::AppConfig,
    http::{AppState, build_router},
    service::ReservationService,
};
use tokio::net::TcpListener;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!(action = "main", status = "shutdown", "shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("seat-server", &LogOptions::from_env());

    let cfg = AppConfig::from_env().context("invalid configuration")?;

    let repo = init_store(&cfg).await?;
    let service = Arc::new(ReservationService::new(repo.clone(), cfg.max_listed_seats));
    let app = build_router(AppState::new(service));

    let listener = TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;

    tracing::info!(action = "main", status = "server_start", addr = %cfg.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    repo.close().await;
    tracing::info!(action = "main", status = "stopped");

    Ok(())
}
