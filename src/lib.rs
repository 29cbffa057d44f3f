//! Joblo Core Library
//!
//! Resilient, authenticated scraping of job postings, company pages and
//! member profiles. The library keeps a logged-in session usable and a batch
//! making progress while individual pages, proxies and logins fail.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Credentials, encrypted session tokens and the session manager
//! - [`browser`] - Browser handle traits and the HTTP-backed handle
//! - [`proxy`] - Proxy list loading, health probes and the proxy pool
//! - [`retry`] - Attempt outcomes, retry policy and the retry orchestrator
//! - [`batch`] - Work items, pacing, cancellation and the batch scheduler
//! - [`extract`] - Record schemas and the extraction pipeline
//! - [`scrape`] - Profile, company and job search operations
//! - [`storage`] - Record storage and paginated reads
//! - [`db`] - Database connection and schema management
//! - [`api`] - HTTP API for scrape triggers and record reads
//! - [`config`] - Environment configuration
//!
//! Data flows from the [`BatchScheduler`] through the [`RetryOrchestrator`],
//! which leases a proxy, launches a browser handle, lets the
//! [`SessionManager`] authenticate it and runs a [`ScrapeOperation`]. Records
//! go to a [`RecordStore`]; failures come back as [`AttemptOutcome`] values.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod batch;
pub mod browser;
pub mod config;
pub mod db;
pub mod extract;
pub mod pacing;
pub mod proxy;
pub mod retry;
pub mod scrape;
pub mod storage;
mod user_agent;

// Re-export commonly used types
pub use auth::{
    Credential, EncryptedFileSessionStore, SessionManager, SessionStore, SessionTiming,
    SiteProfile,
};
pub use batch::{BatchOptions, BatchScheduler, BatchSummary, CancelFlag, WorkItem, WorkTarget};
pub use browser::{BrowserHandle, BrowserLauncher, HttpBrowserLauncher};
pub use config::{ConfigError, Settings};
pub use db::Database;
pub use extract::{Extracted, Record, RecordKind, RecordSchema};
pub use proxy::{HttpProxyProbe, ProxyPool};
pub use retry::{AttemptOutcome, OrchestratedExecutor, RetryOrchestrator, RetryPolicy};
pub use scrape::{ScrapeOperation, SiteScraper};
pub use storage::{RecordStore, SqliteRecordStore};
