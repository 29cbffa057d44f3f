//! Attempt outcomes, retry policy and the retry orchestrator.

mod orchestrator;
mod outcome;
mod policy;

pub use orchestrator::{NO_PROXY_AVAILABLE, OrchestratedExecutor, RetryOrchestrator};
pub use outcome::AttemptOutcome;
pub use policy::{
    DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_browser_error,
    classify_http_status,
};
