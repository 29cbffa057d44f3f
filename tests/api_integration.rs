//! HTTP API tests driven through the router with `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use joblo_core::api::{AppState, BatchTrigger, router};
use joblo_core::{
    Database, Extracted, RecordSchema, RecordStore, SiteProfile, SqliteRecordStore, WorkItem,
    WorkTarget,
};

/// Records triggered batches instead of running them.
#[derive(Default)]
struct RecordingTrigger {
    items: Mutex<Vec<WorkItem>>,
}

impl RecordingTrigger {
    fn targets(&self) -> Vec<WorkTarget> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .map(|item| item.target.clone())
            .collect()
    }
}

impl BatchTrigger for RecordingTrigger {
    fn trigger(&self, items: Vec<WorkItem>) {
        self.items.lock().unwrap().extend(items);
    }
}

struct TestApp {
    state: AppState,
    trigger: Arc<RecordingTrigger>,
}

impl TestApp {
    async fn new() -> Self {
        let trigger = Arc::new(RecordingTrigger::default());
        let state = AppState {
            store: SqliteRecordStore::new(Database::new_in_memory().await.unwrap()),
            batches: trigger.clone(),
            site: Arc::new(SiteProfile::linkedin()),
        };
        Self { state, trigger }
    }

    async fn call(&self, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router(self.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

// ==================== Banner Tests ====================

#[tokio::test]
async fn test_root_returns_banner() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::GET, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to JobLo API");
    assert!(body["version"].is_string());
}

// ==================== Scrape Trigger Tests ====================

#[tokio::test]
async fn test_job_scrape_acknowledges_and_triggers() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/jobs/scrape?search_query=rust&location=Remote&limit=5",
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Job scraping initiated for 'rust' in 'Remote'");
    assert_eq!(body["limit"], 5);
    assert_eq!(
        app.trigger.targets(),
        vec![WorkTarget::JobSearch {
            query: "rust".into(),
            location: "Remote".into(),
            limit: 5,
        }]
    );
}

#[tokio::test]
async fn test_job_scrape_uses_defaults() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::POST, "/api/v1/jobs/scrape").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 10);
    assert_eq!(
        body["message"],
        "Job scraping initiated for 'software engineer' in 'United States'"
    );
}

#[tokio::test]
async fn test_job_scrape_limit_out_of_range_is_rejected() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::POST, "/api/v1/jobs/scrape?limit=51").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("between 1 and 50"));
    assert!(app.trigger.targets().is_empty());
}

#[tokio::test]
async fn test_profile_scrape_rejects_foreign_url() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/profiles/scrape?url=https://example.com/in/ada",
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid LinkedIn profile URL");
    assert!(app.trigger.targets().is_empty());
}

#[tokio::test]
async fn test_profile_scrape_without_url_is_rejected() {
    let app = TestApp::new().await;
    let (status, _) = app.call(Method::POST, "/api/v1/profiles/scrape").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_scrape_echoes_url() {
    let app = TestApp::new().await;
    let url = "https://www.linkedin.com/in/williamhgates/";
    let (status, body) = app
        .call(Method::POST, &format!("/api/v1/profiles/scrape?url={url}"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile scraping initiated");
    assert_eq!(body["url"], url);
    assert!(body.get("limit").is_none());
    assert_eq!(
        app.trigger.targets(),
        vec![WorkTarget::ProfileUrl(url.to_string())]
    );
}

#[tokio::test]
async fn test_company_scrape_triggers_company_target() {
    let app = TestApp::new().await;
    let url = "https://www.linkedin.com/company/microsoft/";
    let (status, body) = app
        .call(Method::POST, &format!("/api/v1/companies/scrape?url={url}"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Company scraping initiated");
    assert_eq!(
        app.trigger.targets(),
        vec![WorkTarget::CompanyUrl(url.to_string())]
    );
}

// ==================== Read Tests ====================

#[tokio::test]
async fn test_list_jobs_returns_stored_rows() {
    let app = TestApp::new().await;
    let job = Extracted::placeholder(
        &RecordSchema::job(),
        Some("https://www.linkedin.com/jobs/view/1/".into()),
    );
    let id = app.state.store.store(&job).await.unwrap();

    let (status, body) = app.call(Method::GET, "/api/v1/jobs").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], id);
    assert_eq!(rows[0]["title"], "Exciting Career Opportunity");
    assert_eq!(rows[0]["placeholder"], true);

    let (status, body) = app.call(Method::GET, &format!("/api/v1/jobs/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://www.linkedin.com/jobs/view/1/");
}

#[tokio::test]
async fn test_list_pagination_bounds() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/api/v1/profiles?page=0").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let (status, _) = app.call(Method::GET, "/api/v1/companies?limit=101").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app.call(Method::GET, "/api/v1/companies?page=2&limit=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(vec![]));
}

#[tokio::test]
async fn test_get_missing_records_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/api/v1/jobs/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Job with ID 7 not found");

    let (status, body) = app.call(Method::GET, "/api/v1/companies/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Company not found");

    let (status, _) = app.call(Method::GET, "/api/v1/profiles/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
