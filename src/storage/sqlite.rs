//! `SQLite`-backed record store.

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{CompanyRow, JobRow, Page, ProfileRow, RecordStore, Result};
use crate::db::Database;
use crate::extract::{Extracted, Record, RecordKind};

const JOB_COLUMNS: &str =
    "id, title, company, location, experience, job_type, posted_by, url, placeholder, scraped_at";
const COMPANY_COLUMNS: &str = "id, name, industry, size, headquarters, founded, website, about, url, placeholder, scraped_at";
const PROFILE_COLUMNS: &str =
    "id, name, headline, location, experience, url, placeholder, scraped_at";

/// Stores records in the `jobs`, `companies` and `profiles` tables.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    db: Database,
}

impl SqliteRecordStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Underlying database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Jobs, newest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`](super::StoreError::Database) if the query fails.
    pub async fn list_jobs(&self, page: Page) -> Result<Vec<JobRow>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY id DESC LIMIT ? OFFSET ?");
        Ok(sqlx::query_as(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.db.pool())
            .await?)
    }

    /// One job by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`](super::StoreError::Database) if the query fails.
    pub async fn get_job(&self, id: i64) -> Result<Option<JobRow>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?");
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?)
    }

    /// Companies, newest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`](super::StoreError::Database) if the query fails.
    pub async fn list_companies(&self, page: Page) -> Result<Vec<CompanyRow>> {
        let sql =
            format!("SELECT {COMPANY_COLUMNS} FROM companies ORDER BY id DESC LIMIT ? OFFSET ?");
        Ok(sqlx::query_as(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.db.pool())
            .await?)
    }

    /// One company by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`](super::StoreError::Database) if the query fails.
    pub async fn get_company(&self, id: i64) -> Result<Option<CompanyRow>> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?");
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?)
    }

    /// Profiles, newest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`](super::StoreError::Database) if the query fails.
    pub async fn list_profiles(&self, page: Page) -> Result<Vec<ProfileRow>> {
        let sql =
            format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY id DESC LIMIT ? OFFSET ?");
        Ok(sqlx::query_as(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.db.pool())
            .await?)
    }

    /// One profile by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`](super::StoreError::Database) if the query fails.
    pub async fn get_profile(&self, id: i64) -> Result<Option<ProfileRow>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?");
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?)
    }

    /// Number of stored rows of `kind`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`](super::StoreError::Database) if the query fails.
    pub async fn count(&self, kind: RecordKind) -> Result<i64> {
        let table = table_for(kind);
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Deletes job rows scraped more than `days` days ago. Returns the number
    /// of rows removed.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`](super::StoreError::Database) if the delete fails.
    #[instrument(skip(self))]
    pub async fn prune_jobs_older_than(&self, days: u32) -> Result<u64> {
        let modifier = format!("-{days} days");
        let result = sqlx::query("DELETE FROM jobs WHERE scraped_at < datetime('now', ?)")
            .bind(modifier)
            .execute(self.db.pool())
            .await?;
        let removed = result.rows_affected();
        info!(removed, days, "pruned stale jobs");
        Ok(removed)
    }
}

fn table_for(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Job => "jobs",
        RecordKind::Company => "companies",
        RecordKind::Profile => "profiles",
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn store(&self, extracted: &Extracted) -> Result<i64> {
        let placeholder = extracted.is_placeholder();
        let pool = self.db.pool();

        let result = match &extracted.record {
            Record::Job(job) => {
                sqlx::query(
                    "INSERT INTO jobs (title, company, location, experience, job_type, posted_by, url, placeholder) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&job.title)
                .bind(&job.company)
                .bind(&job.location)
                .bind(&job.experience)
                .bind(&job.job_type)
                .bind(&job.posted_by)
                .bind(&job.url)
                .bind(placeholder)
                .execute(pool)
                .await?
            }
            Record::Company(company) => {
                sqlx::query(
                    "INSERT INTO companies (name, industry, size, headquarters, founded, website, about, url, placeholder) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&company.name)
                .bind(&company.industry)
                .bind(&company.size)
                .bind(&company.headquarters)
                .bind(&company.founded)
                .bind(&company.website)
                .bind(&company.about)
                .bind(&company.url)
                .bind(placeholder)
                .execute(pool)
                .await?
            }
            Record::Profile(profile) => {
                sqlx::query(
                    "INSERT INTO profiles (name, headline, location, experience, url, placeholder) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(&profile.name)
                .bind(&profile.headline)
                .bind(&profile.location)
                .bind(&profile.experience)
                .bind(&profile.url)
                .bind(placeholder)
                .execute(pool)
                .await?
            }
        };

        let id = result.last_insert_rowid();
        debug!(id, kind = %extracted.record.kind(), placeholder, "record stored");
        Ok(id)
    }
}
