//! HTTP API over the retrieval pipeline.
//!
//! Handlers never call the embedding or generation backends directly; every
//! blocking call goes through the [`CollaboratorPool`].

pub mod pool;
pub mod routes;
pub mod state;

pub use pool::{CollaboratorPool, PoolError};
pub use routes::{ApiError, router};
pub use state::AppState;

use anyhow::Context;
use tokio::net::TcpListener;

/// Bind `bind` and serve until Ctrl+C.
pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let local = listener.local_addr().context("failed to read bound address")?;

    tracing::info!(
        target: "http",
        "listening on http://{local} ({} collaborator workers)",
        state.pool.size()
    );
    eprintln!("docrag listening on http://{local}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!(target: "http", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "http", "failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    eprintln!("Shutting down...");
}
