//! Batch execution: work items, pacing, cancellation and the scheduler.
//!
//! A batch is an ordered slice of [`WorkItem`]s processed one at a time by a
//! [`BatchScheduler`]. Between items the scheduler sleeps a short random
//! interval; after every `batch_size` items it sleeps a long one, checking its
//! [`CancelFlag`] at a fixed sub-interval.

mod scheduler;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

pub use scheduler::{BatchObserver, BatchScheduler, ItemExecutor, NoopObserver, PauseKind};

use crate::pacing::JitterRange;

/// What an item scrapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkTarget {
    /// A member profile URL.
    ProfileUrl(String),
    /// A company page URL.
    CompanyUrl(String),
    /// A job search and how many postings to visit.
    JobSearch {
        query: String,
        location: String,
        limit: usize,
    },
}

impl fmt::Display for WorkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProfileUrl(url) | Self::CompanyUrl(url) => f.write_str(url),
            Self::JobSearch {
                query, location, ..
            } => write!(f, "jobs: '{query}' in '{location}'"),
        }
    }
}

/// Lifecycle of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Succeeded,
    Failed,
    Skipped,
}

impl ItemStatus {
    /// Whether the item has left `Pending`.
    #[must_use]
    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One unit of work in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    /// Identifier used in logs and progress output.
    pub id: String,
    pub target: WorkTarget,
    status: ItemStatus,
}

impl WorkItem {
    /// Creates a pending item.
    #[must_use]
    pub fn new(id: impl Into<String>, target: WorkTarget) -> Self {
        Self {
            id: id.into(),
            target,
            status: ItemStatus::Pending,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Moves a pending item to `status`.
    ///
    /// Returns `false`, leaving the item unchanged, if it has already
    /// settled or `status` is `Pending`.
    pub fn settle(&mut self, status: ItemStatus) -> bool {
        if self.status.is_settled() || !status.is_settled() {
            return false;
        }
        self.status = status;
        true
    }
}

/// Shared cancellation flag.
///
/// Clones observe the same flag. Setting it stops the scheduler from
/// starting further items; the item in flight finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that is not set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Delays between items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Short pause between consecutive items.
    pub item_delay: JitterRange,
    /// Cancellation check interval during long pauses.
    pub poll_interval: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            item_delay: JitterRange::secs(3, 8),
            poll_interval: Duration::from_secs(10),
        }
    }
}

impl Pacing {
    /// No short pauses; long pauses still poll every second.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            item_delay: JitterRange::ZERO,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Batch sizing and long-pause bounds for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Items between long pauses.
    pub batch_size: usize,
    /// Shortest long pause.
    pub min_delay: Duration,
    /// Longest long pause.
    pub max_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            min_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(180),
        }
    }
}

/// Aggregate result of one batch run.
///
/// `attempted == succeeded + failed` always holds. `placeholders` counts
/// succeeded items whose records were all placeholders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub placeholders: usize,
    pub cancelled: bool,
}
