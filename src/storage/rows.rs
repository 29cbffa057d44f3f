//! Stored rows and pagination.

use serde::Serialize;
use sqlx::FromRow;

use super::StoreError;

/// Largest page the read API serves.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A validated page request: `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: u32,
    limit: u32,
}

impl Page {
    /// Validates `page >= 1` and `1 <= limit <= 100`.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidPage`] when either bound is violated.
    pub fn new(page: u32, limit: u32) -> Result<Self, StoreError> {
        if page == 0 {
            return Err(StoreError::InvalidPage("page must be at least 1".into()));
        }
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(StoreError::InvalidPage(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        Ok(Self { page, limit })
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct JobRow {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub experience: String,
    pub job_type: String,
    pub posted_by: String,
    pub url: Option<String>,
    pub placeholder: bool,
    pub scraped_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct CompanyRow {
    pub id: i64,
    pub name: String,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub headquarters: Option<String>,
    pub founded: Option<String>,
    pub website: Option<String>,
    pub about: Option<String>,
    pub url: Option<String>,
    pub placeholder: bool,
    pub scraped_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct ProfileRow {
    pub id: i64,
    pub name: String,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub url: Option<String>,
    pub placeholder: bool,
    pub scraped_at: String,
}
