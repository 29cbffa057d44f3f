use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::{ApiError, AppState};
use crate::batch::{WorkItem, WorkTarget};
use crate::storage::{CompanyRow, JobRow, Page, ProfileRow};

const DEFAULT_SEARCH_QUERY: &str = "software engineer";
const DEFAULT_SEARCH_LOCATION: &str = "United States";
const DEFAULT_JOB_LIMIT: u32 = 10;
const MAX_JOB_LIMIT: u32 = 50;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub(super) struct JobScrapeParams {
    search_query: Option<String>,
    location: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UrlParams {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PageParams {
    page: Option<u32>,
    limit: Option<u32>,
}

impl PageParams {
    fn page(&self) -> Result<Page, ApiError> {
        Ok(Page::new(self.page.unwrap_or(1), self.limit.unwrap_or(10))?)
    }
}

/// Acknowledgement for a triggered scrape.
#[derive(Debug, Serialize)]
pub(super) struct ScrapeAck {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

pub(super) async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to JobLo API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(super) async fn scrape_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobScrapeParams>,
) -> ApiResult<ScrapeAck> {
    let limit = params.limit.unwrap_or(DEFAULT_JOB_LIMIT);
    if !(1..=MAX_JOB_LIMIT).contains(&limit) {
        return Err(ApiError::unprocessable(format!(
            "limit must be between 1 and {MAX_JOB_LIMIT}"
        )));
    }
    let query = params
        .search_query
        .unwrap_or_else(|| DEFAULT_SEARCH_QUERY.to_string());
    let location = params
        .location
        .unwrap_or_else(|| DEFAULT_SEARCH_LOCATION.to_string());

    let message = format!("Job scraping initiated for '{query}' in '{location}'");
    let item = WorkItem::new(
        format!("jobs:{query}@{location}"),
        WorkTarget::JobSearch {
            query,
            location,
            limit: limit as usize,
        },
    );
    state.batches.trigger(vec![item]);
    info!(limit, "job scrape triggered");

    Ok(Json(ScrapeAck {
        status: "success",
        message,
        limit: Some(limit),
        url: None,
    }))
}

pub(super) async fn scrape_profile(
    State(state): State<AppState>,
    Query(params): Query<UrlParams>,
) -> ApiResult<ScrapeAck> {
    let url = params
        .url
        .filter(|url| state.site.is_profile_url(url))
        .ok_or_else(|| ApiError::bad_request("Invalid LinkedIn profile URL"))?;

    state
        .batches
        .trigger(vec![WorkItem::new(url.clone(), WorkTarget::ProfileUrl(url.clone()))]);
    info!(%url, "profile scrape triggered");

    Ok(Json(ScrapeAck {
        status: "success",
        message: "Profile scraping initiated".to_string(),
        limit: None,
        url: Some(url),
    }))
}

pub(super) async fn scrape_company(
    State(state): State<AppState>,
    Query(params): Query<UrlParams>,
) -> ApiResult<ScrapeAck> {
    let url = params
        .url
        .filter(|url| state.site.is_company_url(url))
        .ok_or_else(|| ApiError::bad_request("Invalid LinkedIn company URL"))?;

    state
        .batches
        .trigger(vec![WorkItem::new(url.clone(), WorkTarget::CompanyUrl(url.clone()))]);
    info!(%url, "company scrape triggered");

    Ok(Json(ScrapeAck {
        status: "success",
        message: "Company scraping initiated".to_string(),
        limit: None,
        url: Some(url),
    }))
}

pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Vec<JobRow>> {
    Ok(Json(state.store.list_jobs(params.page()?).await?))
}

pub(super) async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<JobRow> {
    state
        .store
        .get_job(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Job with ID {id} not found")))
}

pub(super) async fn list_companies(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Vec<CompanyRow>> {
    Ok(Json(state.store.list_companies(params.page()?).await?))
}

pub(super) async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<CompanyRow> {
    state
        .store
        .get_company(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Company not found"))
}

pub(super) async fn list_profiles(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Vec<ProfileRow>> {
    Ok(Json(state.store.list_profiles(params.page()?).await?))
}

pub(super) async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ProfileRow> {
    state
        .store
        .get_profile(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Profile not found"))
}
