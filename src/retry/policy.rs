//! Retry policy with exponential backoff, and browser error classification.
//!
//! # Overview
//!
//! A failed attempt is classified into a [`FailureType`]:
//! - [`FailureType::Retryable`] - transient; another attempt through a fresh
//!   proxy may succeed
//! - [`FailureType::Fatal`] - retrying cannot help (bad credentials, markup
//!   drift, malformed input)
//! - [`FailureType::Challenge`] - interactive verification timed out; needs a
//!   human, not another attempt
//!
//! [`RetryPolicy`] then decides whether to retry and how long to back off.
//!
//! # Example
//!
//! ```
//! use joblo_core::retry::{FailureType, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! match policy.should_retry(FailureType::Retryable, 1) {
//!     RetryDecision::Retry { delay, attempt } => println!("attempt {attempt} in {delay:?}"),
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use crate::browser::BrowserError;

/// Default attempt budget per work item (one direct, two proxied).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(500);

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Transient; worth another attempt.
    Retryable,
    /// Permanent; another attempt would fail the same way.
    Fatal,
    /// Interactive verification was not completed in time.
    Challenge,
}

/// Whether to make another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after `delay`.
    Retry {
        /// Backoff before the next attempt.
        delay: Duration,
        /// Number of the next attempt (1-indexed).
        attempt: u32,
    },
    /// Stop.
    DoNotRetry {
        /// Why.
        reason: String,
    },
}

/// Attempt budget and backoff shape.
///
/// `delay = min(base_delay * multiplier^(attempt - 1), max_delay) + jitter`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }

    /// A policy that retries without waiting.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_jitter: Duration::ZERO,
        }
    }

    /// Same backoff, different attempt budget.
    #[must_use]
    pub fn with_max_attempts(&self, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..self.clone()
        }
    }

    /// Attempt budget including the first attempt.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what happens after `attempt` (1-indexed) failed with `failure`.
    #[instrument(level = "debug", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure: FailureType, attempt: u32) -> RetryDecision {
        match failure {
            FailureType::Fatal => {
                return RetryDecision::DoNotRetry {
                    reason: "fatal failure - retry would not help".to_string(),
                };
            }
            FailureType::Challenge => {
                return RetryDecision::DoNotRetry {
                    reason: "verification challenge needs operator attention".to_string(),
                };
            }
            FailureType::Retryable => {}
        }

        if attempt >= self.max_attempts {
            debug!(attempt, "attempt budget exhausted");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.delay_for(attempt);
        debug!(attempt, delay_ms = delay.as_millis(), "will retry");
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled_ms = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped_ms = scaled_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let ceiling = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
    }
}

/// Classifies a browser error for retry decisions.
///
/// | Error | Type | Rationale |
/// |-------|------|-----------|
/// | Timeout | Retryable | Proxy or network may recover |
/// | Network (most) | Retryable | Connection-level, try another route |
/// | Network (TLS) | Fatal | Certificate problem, not route-specific |
/// | HTTP status | see [`classify_http_status`] | |
/// | InvalidUrl | Fatal | Input is malformed |
/// | ElementNotFound | Fatal | Page markup differs from expectations |
/// | InvalidSelector | Fatal | Programming error |
/// | Launch | Retryable | Handle startup may succeed next time |
/// | Closed | Fatal | Handle lifecycle bug |
#[must_use]
pub fn classify_browser_error(error: &BrowserError) -> FailureType {
    match error {
        BrowserError::HttpStatus { status, .. } => classify_http_status(*status),
        BrowserError::Timeout { .. } | BrowserError::Launch { .. } => FailureType::Retryable,
        BrowserError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Fatal
            } else {
                FailureType::Retryable
            }
        }
        BrowserError::InvalidUrl { .. }
        | BrowserError::ElementNotFound { .. }
        | BrowserError::InvalidSelector { .. }
        | BrowserError::Closed => FailureType::Fatal,
    }
}

/// Classifies an HTTP status.
///
/// 401, 403 and 429 are retryable here: on an authenticated site they usually
/// mean this route was throttled or flagged, and the next attempt goes out
/// through a different proxy with a fresh session.
#[must_use]
#[allow(clippy::match_same_arms)]
pub fn classify_http_status(status: u16) -> FailureType {
    match status {
        400 => FailureType::Fatal,
        401 | 403 => FailureType::Retryable,
        404 | 410 | 451 => FailureType::Fatal,
        408 | 429 => FailureType::Retryable,
        500..=599 => FailureType::Retryable,
        400..=499 => FailureType::Fatal,
        _ => FailureType::Retryable,
    }
}

fn is_tls_error(error: &reqwest::Error) -> bool {
    let mut source: Option<&dyn std::error::Error> = Some(error);
    while let Some(current) = source {
        let text = current.to_string().to_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("ssl") {
            return true;
        }
        source = current.source();
    }
    false
}
