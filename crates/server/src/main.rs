//! HTTP front end for the bill pipeline and the in-memory bill list.

mod config;
mod cors;
mod error;
mod routes;
mod store;
mod telemetry;

use anyhow::Context;
use billflow_pipeline::BillPipeline;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    telemetry::init(config.log_format)?;

    let app = routes::router(AppState::new(BillPipeline::from_env()), &config);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "bill server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("bill server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
