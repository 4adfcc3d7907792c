//! Serve command - HTTP API.

use anyhow::Context;

use crate::config::Settings;
use crate::server::{self, AppState};
use crate::services::Services;

pub fn run(settings: Settings, bind: Option<String>, no_index: bool) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| settings.server.bind.clone());

    // Blocking HTTP clients must be built outside the runtime.
    let services = Services::from_settings(&settings)?;
    let state = AppState::new(services, &settings);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        if settings.server.index_on_startup && !no_index {
            spawn_startup_reindex(&state);
        }
        server::serve(state, &bind).await
    })
}

/// Index the corpus in the background so the API is reachable immediately.
fn spawn_startup_reindex(state: &AppState) {
    let reindexer = state.services.reindexer.clone();
    let handle = state.services.index.clone();
    let pool = state.pool.clone();

    tokio::spawn(async move {
        match pool.run(move || reindexer.run(&handle)).await {
            Ok(Ok(report)) => crate::log_event!(
                "services",
                "startup index",
                "{}/{} documents, {} chunks",
                report.documents_indexed,
                report.documents_attempted,
                report.total_chunks
            ),
            Ok(Err(e)) => tracing::error!(target: "services", "startup indexing failed: {e}"),
            Err(e) => tracing::error!(target: "services", "startup indexing failed: {e}"),
        }
    });
}
