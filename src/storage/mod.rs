//! Storage collaborator for extracted records.
//!
//! The batch scheduler only sees [`RecordStore`]. [`SqliteRecordStore`] is the
//! production implementation and also serves the paginated reads behind the
//! HTTP API; [`MemoryRecordStore`] keeps records in memory for tests and
//! embedding.

mod error;
mod rows;
mod sqlite;

use std::sync::Mutex;

use async_trait::async_trait;

pub use error::{DbErrorKind, StoreError};
pub use rows::{CompanyRow, JobRow, MAX_PAGE_LIMIT, Page, ProfileRow};
pub use sqlite::SqliteRecordStore;

use crate::extract::{Extracted, RecordKind};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Persists one extracted record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Stores `record` and returns its row id.
    ///
    /// # Errors
    ///
    /// Implementation-specific; the batch scheduler marks the item failed.
    async fn store(&self, record: &Extracted) -> Result<i64>;
}

/// In-memory store. Ids start at 1.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<Extracted>>,
    reject_writes: bool,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails.
    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            records: Mutex::default(),
            reject_writes: true,
        }
    }

    /// Copy of everything stored so far.
    #[must_use]
    pub fn records(&self) -> Vec<Extracted> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Number of stored records of `kind`.
    #[must_use]
    pub fn count(&self, kind: RecordKind) -> usize {
        self.records()
            .iter()
            .filter(|r| r.record.kind() == kind)
            .count()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn store(&self, record: &Extracted) -> Result<i64> {
        if self.reject_writes {
            return Err(StoreError::Unavailable("writes rejected".into()));
        }
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("record list poisoned".into()))?;
        records.push(record.clone());
        Ok(i64::try_from(records.len()).unwrap_or(i64::MAX))
    }
}
