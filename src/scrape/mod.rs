//! Scraping operations run inside an authenticated attempt.
//!
//! [`SiteScraper`] handles every [`WorkTarget`]: a single profile or company
//! page becomes one record; a job search visits up to `limit` job pages and
//! yields one record per page that loaded.

mod targets;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::auth::SiteProfile;
use crate::batch::{WorkItem, WorkTarget};
use crate::browser::{BrowserError, BrowserHandle};
use crate::extract::{Extracted, RecordSchema, extract_record};
use crate::pacing::JitterRange;
use crate::retry::AttemptOutcome;

pub use targets::{MAX_PROFILE_COUNT, profile_urls_from_text, sample_profile_urls};

/// Records produced by one successful operation.
pub type Payload = Vec<Extracted>;

/// Link selectors for job search results, most specific first.
const JOB_LINK_SELECTORS: &[&str] = &[
    "a.job-card-list__title",
    "a.job-card-container__link",
    "a.base-card__full-link",
    "a[href*='/jobs/view/']",
];

/// One unit of scraping, run on an already authenticated handle.
#[async_trait]
pub trait ScrapeOperation: Send + Sync {
    /// Scrapes `item` with `handle`.
    ///
    /// A redirect to a login wall or challenge is reported as a retryable
    /// failure so the next attempt starts from a fresh session.
    async fn execute(
        &self,
        handle: &mut dyn BrowserHandle,
        item: &WorkItem,
    ) -> AttemptOutcome<Payload>;
}

/// Scrapes profiles, companies and job searches on one site.
#[derive(Debug, Clone)]
pub struct SiteScraper {
    site: SiteProfile,
    settle: JitterRange,
}

impl SiteScraper {
    /// Creates a scraper with a 2 to 5 second settle delay after navigation.
    #[must_use]
    pub fn new(site: SiteProfile) -> Self {
        Self {
            site,
            settle: JitterRange::secs(2, 5),
        }
    }

    /// Replaces the post-navigation settle delay.
    #[must_use]
    pub fn with_settle(mut self, settle: JitterRange) -> Self {
        self.settle = settle;
        self
    }

    async fn visit(&self, handle: &mut dyn BrowserHandle, url: &str) -> Result<String, BrowserError> {
        handle.navigate(url).await?;
        self.settle.pause().await;
        handle.current_url().await
    }

    /// Failure for a location that shows the session is gone, if it is one.
    fn session_lost(&self, location: &str) -> Option<AttemptOutcome<Payload>> {
        if self.site.is_login_wall(location) || self.site.is_challenge(location) {
            warn!(%location, "session lost mid-operation");
            Some(AttemptOutcome::RetryableFailure(format!(
                "session lost: redirected to {location}"
            )))
        } else {
            None
        }
    }

    async fn scrape_page(
        &self,
        handle: &mut dyn BrowserHandle,
        url: &str,
        schema: &RecordSchema,
        on_target: fn(&SiteProfile, &str) -> bool,
    ) -> AttemptOutcome<Payload> {
        let location = match self.visit(handle, url).await {
            Ok(location) => location,
            Err(e) => return AttemptOutcome::from_browser_error(&e),
        };
        if let Some(lost) = self.session_lost(&location) {
            return lost;
        }
        if !on_target(&self.site, &location) {
            return AttemptOutcome::FatalFailure(format!(
                "redirected away from target to {location}"
            ));
        }

        match extract_record(handle, schema, Some(url.to_string())).await {
            Ok(extracted) => {
                if extracted.is_placeholder() {
                    info!(%url, kind = %schema.kind, "no fields matched; storing placeholder");
                }
                AttemptOutcome::Success(vec![extracted])
            }
            Err(e) => AttemptOutcome::from_browser_error(&e),
        }
    }

    async fn scrape_jobs(
        &self,
        handle: &mut dyn BrowserHandle,
        query: &str,
        location: &str,
        limit: usize,
    ) -> AttemptOutcome<Payload> {
        let search_url = match self.site.job_search_url(query, location) {
            Ok(url) => url,
            Err(e) => return AttemptOutcome::FatalFailure(format!("invalid job search URL: {e}")),
        };
        let landed = match self.visit(handle, search_url.as_str()).await {
            Ok(landed) => landed,
            Err(e) => return AttemptOutcome::from_browser_error(&e),
        };
        if let Some(lost) = self.session_lost(&landed) {
            return lost;
        }

        let links = match collect_job_links(handle, &landed, limit).await {
            Ok(links) => links,
            Err(e) => return AttemptOutcome::from_browser_error(&e),
        };
        info!(found = links.len(), limit, "collected job links");

        let schema = RecordSchema::job();
        let mut records = Vec::with_capacity(links.len());
        for link in &links {
            match self.visit(handle, link).await {
                Ok(at) => {
                    if let Some(lost) = self.session_lost(&at) {
                        return lost;
                    }
                }
                Err(e) => {
                    warn!(%link, error = %e, "job page failed to load; skipping");
                    continue;
                }
            }
            match extract_record(handle, &schema, Some(link.clone())).await {
                Ok(extracted) => records.push(extracted),
                Err(e) => warn!(%link, error = %e, "job extraction failed; skipping"),
            }
        }

        if records.is_empty() {
            info!(%search_url, "no job records extracted; storing placeholder");
            records.push(Extracted::placeholder(&schema, Some(search_url.to_string())));
        }
        AttemptOutcome::Success(records)
    }
}

#[async_trait]
impl ScrapeOperation for SiteScraper {
    #[instrument(skip(self, handle, item), fields(item = %item.id))]
    async fn execute(
        &self,
        handle: &mut dyn BrowserHandle,
        item: &WorkItem,
    ) -> AttemptOutcome<Payload> {
        match &item.target {
            WorkTarget::ProfileUrl(url) => {
                self.scrape_page(handle, url, &RecordSchema::profile(), SiteProfile::is_profile_url)
                    .await
            }
            WorkTarget::CompanyUrl(url) => {
                self.scrape_page(handle, url, &RecordSchema::company(), SiteProfile::is_company_url)
                    .await
            }
            WorkTarget::JobSearch {
                query,
                location,
                limit,
            } => self.scrape_jobs(handle, query, location, *limit).await,
        }
    }
}

/// Job detail links on the loaded search page, absolute, query-free and
/// de-duplicated, at most `limit`.
///
/// The first selector that yields any link wins.
async fn collect_job_links(
    handle: &mut dyn BrowserHandle,
    page_url: &str,
    limit: usize,
) -> Result<Vec<String>, BrowserError> {
    let base = Url::parse(page_url).map_err(|_| BrowserError::invalid_url(page_url))?;

    for selector in JOB_LINK_SELECTORS {
        let hrefs = match handle.select_attrs(selector, "href").await {
            Ok(hrefs) => hrefs,
            Err(e) if e.is_selector_miss() => continue,
            Err(e) => return Err(e),
        };

        let mut links: Vec<String> = Vec::new();
        for href in hrefs {
            let Ok(mut resolved) = base.join(href.trim()) else {
                debug!(%href, "unresolvable job link");
                continue;
            };
            resolved.set_query(None);
            resolved.set_fragment(None);
            let resolved = resolved.to_string();
            if !links.contains(&resolved) {
                links.push(resolved);
            }
            if links.len() >= limit {
                break;
            }
        }

        if !links.is_empty() {
            debug!(selector, count = links.len(), "job link selector matched");
            return Ok(links);
        }
    }
    Ok(Vec::new())
}
