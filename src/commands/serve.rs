//! Serve command handler: the HTTP API over the local database.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use joblo_core::api::{AppState, BackgroundBatches, router};
use joblo_core::{CancelFlag, Settings};
use tokio::net::TcpListener;
use tracing::info;

use crate::app::runtime::Runtime;
use crate::cli::ServeArgs;

pub async fn run_serve_command(args: &ServeArgs) -> Result<()> {
    let options = args.batch.options().map_err(|message| anyhow!(message))?;
    let settings = Settings::from_env()?;
    let runtime = Runtime::build(&settings).await?;

    // Background batches always run to completion; nothing sets this flag.
    let scheduler = runtime.scheduler(args.batch.max_attempts, CancelFlag::new(), None);
    let state = AppState {
        store: runtime.store.clone(),
        batches: Arc::new(BackgroundBatches::new(Arc::new(scheduler), options)),
        site: Arc::new(runtime.site.clone()),
    };

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Cannot bind {}", args.bind))?;
    info!(address = %args.bind, "API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("API server failed")?;

    runtime.store.database().close().await;
    Ok(())
}
