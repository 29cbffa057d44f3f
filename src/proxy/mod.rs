//! Proxy pool: health-checked, round-robin proxy leasing for retry attempts.
//!
//! # Overview
//!
//! The pool starts from a candidate list (usually `proxies.txt`, one
//! `host:port` per line). Endpoints begin [`ProxyHealth::Unknown`] and only
//! become eligible once a [`ProxyProbe`] has marked them healthy. When the
//! healthy set is empty the pool re-probes candidates in order until a
//! minimum healthy count is reached or the list is exhausted.
//!
//! [`ProxyPool::next`] leases endpoints round-robin and avoids handing the
//! same endpoint to two concurrent retry loops unless every healthy endpoint
//! is already leased. Callers hand endpoints back with [`ProxyPool::release`].

mod pool;
mod probe;

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

pub use pool::{DEFAULT_MIN_HEALTHY, ProxyPool};
pub use probe::{DEFAULT_PROBE_TIMEOUT, HttpProxyProbe, ProxyProbe};

/// Health of a proxy endpoint as of its last probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyHealth {
    /// Never probed; not eligible.
    Unknown,
    /// Last probe succeeded.
    Healthy,
    /// Last probe failed.
    Unhealthy,
}

/// One candidate proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyEndpoint {
    /// `host:port`, or a full proxy URL.
    pub address: String,
    /// Result of the last probe.
    pub health: ProxyHealth,
    /// When the endpoint was last probed.
    pub last_checked_at: Option<SystemTime>,
}

impl ProxyEndpoint {
    /// Creates an unprobed endpoint.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            health: ProxyHealth::Unknown,
            last_checked_at: None,
        }
    }

    /// The proxy as a URL; bare `host:port` addresses are treated as HTTP proxies.
    #[must_use]
    pub fn proxy_url(&self) -> String {
        if self.address.contains("://") {
            self.address.clone()
        } else {
            format!("http://{}", self.address)
        }
    }
}

/// Errors from proxy list loading and probing.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The proxy list file could not be read.
    #[error("failed to read proxy list {path}: {source}")]
    ListUnreadable {
        /// Path that was read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The probe request could not be completed.
    #[error("probe through {address} failed: {reason}")]
    Unreachable {
        /// Proxy address.
        address: String,
        /// What went wrong.
        reason: String,
    },

    /// The probe completed with an unexpected status.
    #[error("probe through {address} returned HTTP {status}")]
    BadStatus {
        /// Proxy address.
        address: String,
        /// Status received.
        status: u16,
    },
}

/// Parses proxy list content: one address per line, `#` comments and blanks skipped.
#[must_use]
pub fn parse_proxy_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Reads a proxy list file. A missing file yields an empty list.
///
/// # Errors
///
/// Returns [`ProxyError::ListUnreadable`] for any other read failure.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_proxy_list(path: &Path) -> Result<Vec<String>, ProxyError> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let addresses = parse_proxy_list(&content);
            debug!(count = addresses.len(), "loaded proxy list");
            Ok(addresses)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no proxy list file; pool starts empty");
            Ok(Vec::new())
        }
        Err(source) => Err(ProxyError::ListUnreadable {
            path: path.display().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_url_adds_http_scheme() {
        assert_eq!(ProxyEndpoint::new("10.0.0.1:8080").proxy_url(), "http://10.0.0.1:8080");
        assert_eq!(
            ProxyEndpoint::new("socks5://10.0.0.1:1080").proxy_url(),
            "socks5://10.0.0.1:1080"
        );
    }

    #[test]
    fn test_new_endpoint_is_unknown() {
        let endpoint = ProxyEndpoint::new("a:1");
        assert_eq!(endpoint.health, ProxyHealth::Unknown);
        assert!(endpoint.last_checked_at.is_none());
    }

    #[test]
    fn test_parse_proxy_list_skips_comments_and_blanks() {
        let list = parse_proxy_list("# free list\n1.1.1.1:80\n\n  2.2.2.2:3128  \n#3.3.3.3:1\n");
        assert_eq!(list, vec!["1.1.1.1:80", "2.2.2.2:3128"]);
    }

    #[test]
    fn test_load_proxy_list_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let list = load_proxy_list(&dir.path().join("absent.txt")).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_load_proxy_list_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxies.txt");
        fs::write(&path, "1.1.1.1:80\n2.2.2.2:80\n").unwrap();
        assert_eq!(load_proxy_list(&path).unwrap().len(), 2);
    }
}
