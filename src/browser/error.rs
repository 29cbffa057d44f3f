//! Error types for browser handles.

use thiserror::Error;

/// Errors raised while driving a browser handle.
///
/// Retry classification lives in
/// [`classify_browser_error`](crate::retry::classify_browser_error).
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Network-level failure (DNS, connection refused, TLS, reset).
    #[error("network error loading {url}: {source}")]
    Network {
        /// URL being loaded.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The page did not load in time.
    #[error("timed out loading {url}")]
    Timeout {
        /// URL being loaded.
        url: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} loading {url}")]
    HttpStatus {
        /// URL being loaded.
        url: String,
        /// Status code.
        status: u16,
    },

    /// A URL could not be parsed or resolved.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },

    /// No element on the current page matches a selector the action needs.
    #[error("no element matches `{selector}`")]
    ElementNotFound {
        /// Selector that matched nothing.
        selector: String,
    },

    /// The selector itself is malformed.
    #[error("invalid selector `{selector}`")]
    InvalidSelector {
        /// Selector that failed to parse.
        selector: String,
    },

    /// The handle could not be started.
    #[error("failed to launch browser: {reason}")]
    Launch {
        /// What went wrong.
        reason: String,
    },

    /// The handle was used after `close`.
    #[error("browser handle is closed")]
    Closed,
}

impl BrowserError {
    /// Wraps a client error, folding timeouts into [`BrowserError::Timeout`].
    #[must_use]
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid-URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an element-not-found error.
    #[must_use]
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// Creates an invalid-selector error.
    #[must_use]
    pub fn invalid_selector(selector: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
        }
    }

    /// Creates a launch error.
    #[must_use]
    pub fn launch(reason: impl Into<String>) -> Self {
        Self::Launch {
            reason: reason.into(),
        }
    }

    /// True for errors that only mean "this selector found nothing here".
    #[must_use]
    pub fn is_selector_miss(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::InvalidSelector { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_error_display() {
        assert_eq!(
            BrowserError::http_status("https://x.test/a", 503).to_string(),
            "HTTP 503 loading https://x.test/a"
        );
        assert_eq!(
            BrowserError::element_not_found("#username").to_string(),
            "no element matches `#username`"
        );
        assert_eq!(BrowserError::Closed.to_string(), "browser handle is closed");
    }

    #[test]
    fn test_is_selector_miss() {
        assert!(BrowserError::element_not_found("a").is_selector_miss());
        assert!(BrowserError::invalid_selector("[[").is_selector_miss());
        assert!(!BrowserError::Closed.is_selector_miss());
        assert!(!BrowserError::launch("boom").is_selector_miss());
    }
}
