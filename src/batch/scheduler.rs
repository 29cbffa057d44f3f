//! Sequential, paced, cancellable batch runner.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::{BatchSummary, CancelFlag, ItemStatus, Pacing, WorkItem};
use crate::pacing::JitterRange;
use crate::retry::AttemptOutcome;
use crate::scrape::Payload;
use crate::storage::RecordStore;

/// Runs one item to an outcome. The retry orchestrator is the production
/// implementation.
#[async_trait]
pub trait ItemExecutor: Send + Sync {
    /// Executes `item`. Failures are outcomes, never panics.
    async fn execute(&self, item: &WorkItem) -> AttemptOutcome<Payload>;
}

/// Which pause is about to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseKind {
    /// Short pause between consecutive items.
    Item,
    /// Long pause after a full batch.
    Batch,
}

/// Progress callbacks. Every method defaults to doing nothing.
pub trait BatchObserver: Send + Sync {
    /// Item `index` is about to run.
    fn item_started(&self, _index: usize, _item: &WorkItem) {}

    /// Item `index` settled.
    fn item_finished(&self, _index: usize, _item: &WorkItem) {}

    /// The scheduler is about to sleep for `delay`.
    fn pausing(&self, _kind: PauseKind, _delay: Duration) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Processes work items strictly in order, one at a time.
pub struct BatchScheduler {
    executor: Arc<dyn ItemExecutor>,
    store: Arc<dyn RecordStore>,
    cancel: CancelFlag,
    pacing: Pacing,
    observer: Arc<dyn BatchObserver>,
}

impl BatchScheduler {
    /// Creates a scheduler with default pacing and no observer.
    #[must_use]
    pub fn new(
        executor: Arc<dyn ItemExecutor>,
        store: Arc<dyn RecordStore>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            executor,
            store,
            cancel,
            pacing: Pacing::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Replaces the pacing.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Installs a progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runs `items` in order.
    ///
    /// Sleeps a short random interval between items and a long one drawn
    /// from `[min_delay, max_delay]` after every `batch_size` items, but
    /// never after the last item. Cancellation is checked before each item
    /// and every poll interval during long pauses; items never started are
    /// marked [`ItemStatus::Skipped`].
    ///
    /// A `batch_size` of zero is treated as one.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn run(
        &self,
        items: &mut [WorkItem],
        batch_size: usize,
        min_delay: Duration,
        max_delay: Duration,
    ) -> BatchSummary {
        let batch_size = batch_size.max(1);
        let batch_delay = JitterRange::new(min_delay, max_delay);
        let total = items.len();
        let mut summary = BatchSummary::default();

        info!(batch_size, "starting batch");

        for index in 0..total {
            if self.cancel.is_cancelled() {
                info!(index, "cancellation observed; not starting further items");
                summary.cancelled = true;
                break;
            }

            let item = &mut items[index];
            self.observer.item_started(index, item);
            debug!(item = %item.id, target = %item.target, "starting item");

            let outcome = self.executor.execute(item).await;
            summary.attempted += 1;

            let status = self.settle_outcome(item, outcome, &mut summary).await;
            item.settle(status);
            self.observer.item_finished(index, item);

            let done = index + 1;
            if done == total {
                break;
            }

            if done % batch_size == 0 {
                let delay = batch_delay.sample();
                self.observer.pausing(PauseKind::Batch, delay);
                info!(
                    completed = done,
                    delay_secs = delay.as_secs(),
                    "batch complete; pausing"
                );
                if self.cancellable_sleep(delay).await {
                    info!(completed = done, "cancelled during batch pause");
                    summary.cancelled = true;
                    break;
                }
            } else {
                let delay = self.pacing.item_delay.sample();
                self.observer.pausing(PauseKind::Item, delay);
                tokio::time::sleep(delay).await;
            }
        }

        for item in items.iter_mut() {
            if item.settle(ItemStatus::Skipped) {
                summary.skipped += 1;
            }
        }

        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            placeholders = summary.placeholders,
            cancelled = summary.cancelled,
            "batch finished"
        );
        summary
    }

    /// Stores a success's records and decides the item's final status.
    async fn settle_outcome(
        &self,
        item: &WorkItem,
        outcome: AttemptOutcome<Payload>,
        summary: &mut BatchSummary,
    ) -> ItemStatus {
        let records = match outcome {
            AttemptOutcome::Success(records) => records,
            failure => {
                warn!(
                    item = %item.id,
                    outcome = failure.kind(),
                    reason = failure.reason().unwrap_or_default(),
                    "item failed"
                );
                summary.failed += 1;
                return ItemStatus::Failed;
            }
        };

        // Each record is written on its own; one failed row does not drop the rest.
        let mut write_failures = 0usize;
        for record in &records {
            if let Err(e) = self.store.store(record).await {
                warn!(
                    item = %item.id,
                    kind = %record.record.kind(),
                    transient = e.is_transient(),
                    error = %e,
                    "failed to store record"
                );
                write_failures += 1;
            }
        }
        if write_failures > 0 {
            warn!(
                item = %item.id,
                failed_writes = write_failures,
                records = records.len(),
                "item failed: records not stored"
            );
            summary.failed += 1;
            return ItemStatus::Failed;
        }

        if !records.is_empty() && records.iter().all(|r| r.is_placeholder()) {
            summary.placeholders += 1;
        }
        info!(item = %item.id, records = records.len(), "item succeeded");
        summary.succeeded += 1;
        ItemStatus::Succeeded
    }

    /// Sleeps for `delay` in poll-interval steps. Returns `true` if
    /// cancellation was observed.
    async fn cancellable_sleep(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        let poll = self.pacing.poll_interval.max(Duration::from_millis(1));
        loop {
            if self.cancel.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::batch::WorkTarget;
    use crate::extract::{Extracted, Record, RecordSchema};
    use crate::storage::{MemoryRecordStore, RecordStore, StoreError};

    /// Succeeds every item with one placeholder job, failing the listed ids.
    struct ScriptedExecutor {
        fail: Vec<&'static str>,
        records_per_item: usize,
        seen: Mutex<Vec<String>>,
        cancel_on: Option<(&'static str, CancelFlag)>,
    }

    impl ScriptedExecutor {
        fn new() -> Self {
            Self {
                fail: Vec::new(),
                records_per_item: 1,
                seen: Mutex::new(Vec::new()),
                cancel_on: None,
            }
        }
    }

    #[async_trait]
    impl ItemExecutor for ScriptedExecutor {
        async fn execute(&self, item: &WorkItem) -> AttemptOutcome<Payload> {
            self.seen.lock().unwrap().push(item.id.clone());
            if let Some((id, flag)) = &self.cancel_on {
                if item.id == *id {
                    let flag = flag.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        flag.cancel();
                    });
                }
            }
            if self.fail.iter().any(|id| *id == item.id) {
                return AttemptOutcome::RetryableFailure("proxy refused".into());
            }
            let records = (1..=self.records_per_item)
                .map(|n| {
                    Extracted::placeholder(&RecordSchema::job(), Some(format!("{}#{n}", item.id)))
                })
                .collect();
            AttemptOutcome::Success(records)
        }
    }

    /// Counts writes and rejects the listed call numbers (1-based).
    #[derive(Default)]
    struct FlakyStore {
        fail_calls: Vec<usize>,
        calls: AtomicUsize,
        stored: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        async fn store(&self, record: &Extracted) -> crate::storage::Result<i64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_calls.contains(&call) {
                return Err(StoreError::Unavailable(format!("write {call} rejected")));
            }
            let mut stored = self.stored.lock().unwrap();
            stored.push(match &record.record {
                Record::Job(job) => job.url.clone(),
                _ => None,
            });
            Ok(i64::try_from(stored.len()).unwrap())
        }
    }

    #[derive(Default)]
    struct PauseLog(Mutex<Vec<(usize, PauseKind)>>, Mutex<usize>);

    impl BatchObserver for PauseLog {
        fn item_finished(&self, index: usize, _item: &WorkItem) {
            *self.1.lock().unwrap() = index + 1;
        }
        fn pausing(&self, kind: PauseKind, _delay: Duration) {
            let done = *self.1.lock().unwrap();
            self.0.lock().unwrap().push((done, kind));
        }
    }

    fn items(n: usize) -> Vec<WorkItem> {
        (1..=n)
            .map(|i| WorkItem::new(i.to_string(), WorkTarget::ProfileUrl(format!("u{i}"))))
            .collect()
    }

    fn scheduler(executor: ScriptedExecutor, cancel: CancelFlag) -> BatchScheduler {
        BatchScheduler::new(
            Arc::new(executor),
            Arc::new(MemoryRecordStore::new()),
            cancel,
        )
        .with_pacing(Pacing {
            item_delay: JitterRange::secs(3, 8),
            poll_interval: Duration::from_secs(10),
        })
    }

    // ==================== Pacing Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_long_pauses_after_each_full_batch_but_not_last_item() {
        let log = Arc::new(PauseLog::default());
        let scheduler = scheduler(ScriptedExecutor::new(), CancelFlag::new())
            .with_observer(log.clone());

        let mut items = items(12);
        let summary = scheduler
            .run(&mut items, 5, Duration::from_secs(60), Duration::from_secs(180))
            .await;

        let pauses = log.0.lock().unwrap().clone();
        let batch_pauses: Vec<usize> = pauses
            .iter()
            .filter(|(_, kind)| *kind == PauseKind::Batch)
            .map(|(done, _)| *done)
            .collect();
        assert_eq!(batch_pauses, vec![5, 10]);
        assert_eq!(pauses.len(), 11);
        assert_eq!(summary.attempted, 12);
        assert_eq!(summary.succeeded, 12);
        assert!(!summary.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_run_in_input_order() {
        let executor = Arc::new(ScriptedExecutor::new());
        let scheduler = BatchScheduler::new(
            executor.clone(),
            Arc::new(MemoryRecordStore::new()),
            CancelFlag::new(),
        )
        .with_pacing(Pacing::immediate());

        let mut items = items(4);
        scheduler
            .run(&mut items, 2, Duration::ZERO, Duration::ZERO)
            .await;
        assert_eq!(*executor.seen.lock().unwrap(), vec!["1", "2", "3", "4"]);
    }

    // ==================== Outcome Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_the_batch() {
        let mut executor = ScriptedExecutor::new();
        executor.fail = vec!["2", "3"];
        let scheduler = scheduler(executor, CancelFlag::new());

        let mut items = items(4);
        let summary = scheduler
            .run(&mut items, 10, Duration::ZERO, Duration::ZERO)
            .await;

        assert_eq!(summary.attempted, 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.placeholders, 2);
        assert_eq!(summary.attempted, summary.succeeded + summary.failed);
        assert_eq!(items[1].status(), ItemStatus::Failed);
        assert_eq!(items[3].status(), ItemStatus::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_writes_fail_items_but_batch_continues() {
        let scheduler = BatchScheduler::new(
            Arc::new(ScriptedExecutor::new()),
            Arc::new(MemoryRecordStore::rejecting()),
            CancelFlag::new(),
        )
        .with_pacing(Pacing::immediate());

        let mut items = items(3);
        let summary = scheduler
            .run(&mut items, 10, Duration::ZERO, Duration::ZERO)
            .await;

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.attempted, summary.succeeded + summary.failed);
        assert!(items.iter().all(|i| i.status() == ItemStatus::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failed_write_keeps_remaining_records() {
        let mut executor = ScriptedExecutor::new();
        executor.records_per_item = 3;
        let store = Arc::new(FlakyStore {
            fail_calls: vec![2],
            ..FlakyStore::default()
        });
        let scheduler = BatchScheduler::new(Arc::new(executor), store.clone(), CancelFlag::new())
            .with_pacing(Pacing::immediate());

        let mut items = items(2);
        let summary = scheduler
            .run(&mut items, 10, Duration::ZERO, Duration::ZERO)
            .await;

        assert_eq!(store.calls.load(Ordering::SeqCst), 6);
        assert_eq!(
            *store.stored.lock().unwrap(),
            vec![
                Some("1#1".to_string()),
                Some("1#3".to_string()),
                Some("2#1".to_string()),
                Some("2#2".to_string()),
                Some("2#3".to_string()),
            ]
        );
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.attempted, summary.succeeded + summary.failed);
        assert_eq!(items[0].status(), ItemStatus::Failed);
        assert_eq!(items[1].status(), ItemStatus::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch() {
        let scheduler = scheduler(ScriptedExecutor::new(), CancelFlag::new());
        let summary = scheduler
            .run(&mut [], 5, Duration::ZERO, Duration::ZERO)
            .await;
        assert_eq!(summary, BatchSummary::default());
    }

    // ==================== Cancellation Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_batch_pause_stops_before_next_item() {
        let cancel = CancelFlag::new();
        let mut executor = ScriptedExecutor::new();
        executor.cancel_on = Some(("5", cancel.clone()));
        let scheduler = scheduler(executor, cancel);

        let mut items = items(12);
        let summary = scheduler
            .run(&mut items, 5, Duration::from_secs(120), Duration::from_secs(120))
            .await;

        assert_eq!(summary.attempted, 5);
        assert!(summary.cancelled);
        assert_eq!(summary.skipped, 7);
        assert_eq!(items[5].status(), ItemStatus::Skipped);
        assert_eq!(items[4].status(), ItemStatus::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start_skips_everything() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let scheduler = scheduler(ScriptedExecutor::new(), cancel);

        let mut items = items(3);
        let summary = scheduler
            .run(&mut items, 5, Duration::ZERO, Duration::ZERO)
            .await;
        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.skipped, 3);
        assert!(summary.cancelled);
    }
}
