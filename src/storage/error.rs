//! Error types for record storage.

use std::fmt;

use thiserror::Error;

/// What went wrong inside `SQLite`, as far as callers care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Another writer holds the lock or the pool has no free connection.
    Contended,
    /// A CHECK/NOT NULL/UNIQUE constraint rejected the row.
    Constraint,
    /// The pool was closed during shutdown.
    Closed,
    /// Anything else, including IO failures.
    Other,
}

impl DbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::Contended,
            sqlx::Error::PoolClosed => Self::Closed,
            sqlx::Error::Database(db) => {
                let code = db.code();
                let code = code.as_deref().unwrap_or_default();
                // SQLITE_BUSY = 5, SQLITE_LOCKED = 6; extended codes keep the low byte.
                let primary = code.parse::<u32>().map(|c| c & 0xff).ok();
                if matches!(primary, Some(5 | 6)) || db.message().contains("database is locked") {
                    Self::Contended
                } else if db.is_check_violation()
                    || db.is_unique_violation()
                    || matches!(primary, Some(19))
                {
                    Self::Constraint
                } else {
                    Self::Other
                }
            }
            _ => Self::Other,
        }
    }

    /// Whether the same write might succeed a moment later.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Contended)
    }
}

impl fmt::Display for DbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Contended => "contended",
            Self::Constraint => "constraint",
            Self::Closed => "closed",
            Self::Other => "other",
        })
    }
}

/// Errors from record storage and paginated reads.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error ({kind}): {message}")]
    Database {
        kind: DbErrorKind,
        message: String,
    },

    /// Page parameters out of range.
    #[error("invalid page request: {0}")]
    InvalidPage(String),

    /// The in-memory store was told to reject writes.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: DbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl StoreError {
    /// Busy database or exhausted pool; worth retrying later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database { kind, .. } => kind.is_transient(),
            Self::InvalidPage(_) | Self::Unavailable(_) => false,
        }
    }
}
