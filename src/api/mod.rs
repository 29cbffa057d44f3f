//! HTTP API: scrape triggers and read access to stored records.
//!
//! Trigger endpoints validate their input, hand a batch to a
//! [`BatchTrigger`] and acknowledge immediately; the batch runs as a detached
//! background task. Read endpoints page through the [`SqliteRecordStore`].
//!
//! All routes except the banner live under `/api/v1`.

mod error;
mod handlers;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::sync::Mutex;
use tracing::info;

pub use error::ApiError;

use crate::auth::SiteProfile;
use crate::batch::{BatchOptions, BatchScheduler, WorkItem};
use crate::storage::SqliteRecordStore;

/// Starts a batch without waiting for it.
pub trait BatchTrigger: Send + Sync {
    /// Schedules `items` to run in the background.
    fn trigger(&self, items: Vec<WorkItem>);
}

/// Runs triggered batches on the tokio runtime, one at a time.
///
/// Batches queue on an internal lock so a single account never drives two
/// sessions at once.
pub struct BackgroundBatches {
    scheduler: Arc<BatchScheduler>,
    options: BatchOptions,
    running: Arc<Mutex<()>>,
}

impl BackgroundBatches {
    #[must_use]
    pub fn new(scheduler: Arc<BatchScheduler>, options: BatchOptions) -> Self {
        Self {
            scheduler,
            options,
            running: Arc::new(Mutex::new(())),
        }
    }
}

impl BatchTrigger for BackgroundBatches {
    fn trigger(&self, mut items: Vec<WorkItem>) {
        let scheduler = Arc::clone(&self.scheduler);
        let running = Arc::clone(&self.running);
        let options = self.options;

        tokio::spawn(async move {
            let _guard = running.lock().await;
            let summary = scheduler
                .run(
                    &mut items,
                    options.batch_size,
                    options.min_delay,
                    options.max_delay,
                )
                .await;
            info!(
                attempted = summary.attempted,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "background batch finished"
            );
        });
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: SqliteRecordStore,
    pub batches: Arc<dyn BatchTrigger>,
    pub site: Arc<SiteProfile>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/jobs", get(handlers::list_jobs))
        .route("/jobs/scrape", post(handlers::scrape_jobs))
        .route("/jobs/{id}", get(handlers::get_job))
        .route("/companies", get(handlers::list_companies))
        .route("/companies/scrape", post(handlers::scrape_company))
        .route("/companies/{id}", get(handlers::get_company))
        .route("/profiles", get(handlers::list_profiles))
        .route("/profiles/scrape", post(handlers::scrape_profile))
        .route("/profiles/{id}", get(handlers::get_profile));

    Router::new()
        .route("/", get(handlers::root))
        .nest("/api/v1", v1)
        .with_state(state)
}
