//! Scrape command handlers: profile batches, job searches and single companies.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use joblo_core::batch::BatchObserver;
use joblo_core::scrape::{profile_urls_from_text, sample_profile_urls};
use joblo_core::{BatchOptions, BatchSummary, CancelFlag, RecordKind, Settings, WorkItem, WorkTarget};
use tracing::{info, warn};

use crate::app::progress_manager::SpinnerObserver;
use crate::app::runtime::{Runtime, cancel_on_ctrl_c};
use crate::cli::{CompanyArgs, JobsArgs, ProfileSource, ProfilesArgs};

pub async fn run_profiles_command(args: &ProfilesArgs, quiet: bool) -> Result<()> {
    let options = args.batch.options().map_err(|message| anyhow!(message))?;
    let settings = Settings::from_env()?;
    let runtime = Runtime::build(&settings).await?;

    let count = args.capped_count();
    if args.count > count {
        warn!(requested = args.count, count, "profile count capped");
    }

    let urls = match args.source {
        ProfileSource::Sample => sample_profile_urls(&runtime.site, count),
        ProfileSource::File => {
            let path = args
                .file
                .as_deref()
                .ok_or_else(|| anyhow!("--file is required with --source file"))?;
            read_profile_file(path, &runtime, count)?
        }
    };
    if urls.is_empty() {
        bail!("No profile URLs to scrape");
    }

    let mut items: Vec<WorkItem> = urls
        .into_iter()
        .map(|url| WorkItem::new(url.clone(), WorkTarget::ProfileUrl(url)))
        .collect();

    info!(
        profiles = items.len(),
        batch_size = options.batch_size,
        delay_min_secs = options.min_delay.as_secs(),
        delay_max_secs = options.max_delay.as_secs(),
        "Starting profile batch"
    );

    let summary = run_batch(&runtime, &mut items, options, args.batch.max_attempts, quiet).await;
    report(&summary);

    let stored = runtime.store.count(RecordKind::Profile).await?;
    info!(stored, "Profiles in database");

    Ok(())
}

pub async fn run_jobs_command(args: &JobsArgs) -> Result<()> {
    let settings = Settings::from_env()?;
    let runtime = Runtime::build(&settings).await?;

    let item = WorkItem::new(
        format!("jobs:{}@{}", args.query, args.location),
        WorkTarget::JobSearch {
            query: args.query.clone(),
            location: args.location.clone(),
            limit: args.limit as usize,
        },
    );
    info!(search = %item.target, limit = args.limit, "Starting job search");

    let mut items = vec![item];
    let summary = run_batch(
        &runtime,
        &mut items,
        BatchOptions::default(),
        args.max_attempts,
        true,
    )
    .await;
    report(&summary);

    let stored = runtime.store.count(RecordKind::Job).await?;
    info!(stored, "Jobs in database");

    Ok(())
}

pub async fn run_company_command(args: &CompanyArgs) -> Result<()> {
    let settings = Settings::from_env()?;
    let runtime = Runtime::build(&settings).await?;

    if !runtime.site.is_company_url(&args.url) {
        bail!("Not a company page URL: {}", args.url);
    }

    let mut items = vec![WorkItem::new(
        args.url.clone(),
        WorkTarget::CompanyUrl(args.url.clone()),
    )];
    let summary = run_batch(
        &runtime,
        &mut items,
        BatchOptions::default(),
        args.max_attempts,
        true,
    )
    .await;
    report(&summary);

    Ok(())
}

async fn run_batch(
    runtime: &Runtime,
    items: &mut [WorkItem],
    options: BatchOptions,
    max_attempts: u32,
    quiet: bool,
) -> BatchSummary {
    let cancel = CancelFlag::new();
    cancel_on_ctrl_c(cancel.clone());

    let use_spinner = !quiet && io::stderr().is_terminal();
    let spinner = use_spinner.then(|| Arc::new(SpinnerObserver::start(items.len())));
    let scheduler = runtime.scheduler(
        max_attempts,
        cancel,
        spinner.clone().map(|s| s as Arc<dyn BatchObserver>),
    );

    let summary = scheduler
        .run(
            items,
            options.batch_size,
            options.min_delay,
            options.max_delay,
        )
        .await;

    if let Some(spinner) = spinner {
        spinner.finish();
    }
    summary
}

fn read_profile_file(path: &Path, runtime: &Runtime, count: usize) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read profile file '{}'", path.display()))?;
    let csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let urls = profile_urls_from_text(&content, csv, &runtime.site, count);
    info!(path = %path.display(), csv, profiles = urls.len(), "Loaded profile URLs");
    Ok(urls)
}

fn report(summary: &BatchSummary) {
    info!(
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        placeholders = summary.placeholders,
        "Batch complete"
    );
    if summary.cancelled {
        warn!(skipped = summary.skipped, "Batch was cancelled before finishing");
    }
}
