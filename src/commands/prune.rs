//! Prune command handler.

use anyhow::Result;
use joblo_core::Settings;
use tracing::info;

use crate::app::runtime::open_record_store;
use crate::cli::PruneArgs;

pub async fn run_prune_command(args: &PruneArgs) -> Result<()> {
    let settings = Settings::from_env()?;
    let store = open_record_store(&settings).await?;

    let removed = store.prune_jobs_older_than(args.days).await?;
    info!(removed, days = args.days, "Pruned stale job postings");

    Ok(())
}
