//! Runs a scrape operation under the attempt budget.
//!
//! Attempt 1 goes out directly; every later attempt leases a proxy from the
//! pool. Each attempt gets a fresh browser handle, establishes a session on
//! it, runs the operation, and closes the handle whatever happened.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::{AttemptOutcome, RetryDecision, RetryPolicy};
use crate::auth::Authenticator;
use crate::batch::{ItemExecutor, WorkItem};
use crate::browser::BrowserLauncher;
use crate::proxy::{ProxyEndpoint, ProxyPool};
use crate::scrape::{Payload, ScrapeOperation};

/// Reason reported when a proxied attempt finds the pool empty.
pub const NO_PROXY_AVAILABLE: &str = "no proxy available";

/// Wraps operations in session establishment, proxy rotation and backoff.
pub struct RetryOrchestrator {
    launcher: Arc<dyn BrowserLauncher>,
    session: Arc<dyn Authenticator>,
    proxies: Arc<ProxyPool>,
    policy: RetryPolicy,
}

impl RetryOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        session: Arc<dyn Authenticator>,
        proxies: Arc<ProxyPool>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            launcher,
            session,
            proxies,
            policy,
        }
    }

    /// Runs `operation` for `item` with at most `max_attempts` attempts.
    ///
    /// Returns the first success, the first fatal or challenge outcome, or
    /// the last retryable failure once the budget is spent. Never panics and
    /// never returns an error: every failure is an outcome.
    #[instrument(skip(self, operation, item), fields(item = %item.id))]
    pub async fn run(
        &self,
        operation: &dyn ScrapeOperation,
        item: &WorkItem,
        max_attempts: u32,
    ) -> AttemptOutcome<Payload> {
        let policy = self.policy.with_max_attempts(max_attempts);
        let mut attempt = 1;

        loop {
            let proxy = if attempt == 1 {
                None
            } else if let Some(endpoint) = self.proxies.next().await {
                Some(endpoint)
            } else {
                warn!(attempt, "proxied attempt has no proxy");
                return AttemptOutcome::FatalFailure(NO_PROXY_AVAILABLE.to_string());
            };

            let outcome = self.attempt(operation, item, proxy.as_ref()).await;
            if let Some(endpoint) = &proxy {
                self.proxies.release(endpoint).await;
            }

            let Some(failure) = outcome.failure_type() else {
                debug!(attempt, "attempt succeeded");
                return outcome;
            };

            match policy.should_retry(failure, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    info!(
                        attempt,
                        next_attempt = next,
                        delay_ms = delay.as_millis(),
                        outcome = outcome.kind(),
                        reason = outcome.reason().unwrap_or_default(),
                        "attempt failed; retrying through a proxy"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(attempt, outcome = outcome.kind(), %reason, "giving up on item");
                    return outcome;
                }
            }
        }
    }

    async fn attempt(
        &self,
        operation: &dyn ScrapeOperation,
        item: &WorkItem,
        proxy: Option<&ProxyEndpoint>,
    ) -> AttemptOutcome<Payload> {
        let proxy_label = proxy.map_or("direct", |p| p.address.as_str());
        let mut handle = match self.launcher.launch(proxy).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(route = proxy_label, error = %e, "browser launch failed");
                return AttemptOutcome::from_browser_error(&e);
            }
        };
        debug!(route = proxy_label, "browser handle launched");

        let outcome = match self.session.establish(handle.as_mut()).await.into_result() {
            Ok(()) => operation.execute(handle.as_mut(), item).await,
            Err(failure) => failure,
        };

        if let Err(e) = handle.close().await {
            warn!(route = proxy_label, error = %e, "failed to close browser handle");
        }
        outcome
    }
}

/// Binds an orchestrator to one operation and budget so the batch scheduler
/// can drive it item by item.
pub struct OrchestratedExecutor {
    orchestrator: Arc<RetryOrchestrator>,
    operation: Arc<dyn ScrapeOperation>,
    max_attempts: u32,
}

impl OrchestratedExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(
        orchestrator: Arc<RetryOrchestrator>,
        operation: Arc<dyn ScrapeOperation>,
        max_attempts: u32,
    ) -> Self {
        Self {
            orchestrator,
            operation,
            max_attempts,
        }
    }
}

#[async_trait]
impl ItemExecutor for OrchestratedExecutor {
    async fn execute(&self, item: &WorkItem) -> AttemptOutcome<Payload> {
        self.orchestrator
            .run(self.operation.as_ref(), item, self.max_attempts)
            .await
    }
}
