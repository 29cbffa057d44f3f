//! The result of one attempt.

use std::fmt;

use super::policy::{FailureType, classify_browser_error};
use crate::browser::BrowserError;

/// Outcome of a session establishment, an operation, or a whole retry loop.
///
/// `T` is the success payload: `()` for session establishment, extracted
/// records for scrape operations.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome<T> {
    /// The attempt produced its payload.
    Success(T),
    /// Transient failure; a later attempt may succeed.
    RetryableFailure(String),
    /// Permanent failure; stop retrying.
    FatalFailure(String),
    /// Interactive verification was not completed before the deadline.
    ChallengeTimeout,
}

impl<T> AttemptOutcome<T> {
    /// Converts a browser error into the failure its classification implies.
    #[must_use]
    pub fn from_browser_error(error: &BrowserError) -> Self {
        match classify_browser_error(error) {
            FailureType::Retryable => Self::RetryableFailure(error.to_string()),
            FailureType::Fatal | FailureType::Challenge => Self::FatalFailure(error.to_string()),
        }
    }

    /// True for [`AttemptOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure classification, `None` on success.
    #[must_use]
    pub fn failure_type(&self) -> Option<FailureType> {
        match self {
            Self::Success(_) => None,
            Self::RetryableFailure(_) => Some(FailureType::Retryable),
            Self::FatalFailure(_) => Some(FailureType::Fatal),
            Self::ChallengeTimeout => Some(FailureType::Challenge),
        }
    }

    /// Short label for logs and summaries.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::RetryableFailure(_) => "retryable_failure",
            Self::FatalFailure(_) => "fatal_failure",
            Self::ChallengeTimeout => "challenge_timeout",
        }
    }

    /// The failure reason, `None` on success.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::RetryableFailure(reason) | Self::FatalFailure(reason) => Some(reason),
            Self::ChallengeTimeout => Some("verification challenge timed out"),
        }
    }

    /// Splits off the payload, re-typing any failure for a different payload.
    ///
    /// # Errors
    ///
    /// Returns the failure unchanged (apart from its payload type).
    pub fn into_result<U>(self) -> Result<T, AttemptOutcome<U>> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::RetryableFailure(reason) => Err(AttemptOutcome::RetryableFailure(reason)),
            Self::FatalFailure(reason) => Err(AttemptOutcome::FatalFailure(reason)),
            Self::ChallengeTimeout => Err(AttemptOutcome::ChallengeTimeout),
        }
    }
}

impl<T> fmt::Display for AttemptOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{}: {reason}", self.kind()),
            None => f.write_str(self.kind()),
        }
    }
}
