//! Proxy health probes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use tracing::{debug, instrument};

use super::{ProxyEndpoint, ProxyError};
use crate::user_agent;

/// Probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Decides whether a proxy can currently reach the target site.
#[async_trait]
pub trait ProxyProbe: Send + Sync {
    /// Probes `address`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError`] describing why the proxy is unhealthy.
    async fn probe(&self, address: &str) -> Result<(), ProxyError>;
}

/// Fetches a target URL through the proxy and expects a 2xx answer.
#[derive(Debug, Clone)]
pub struct HttpProxyProbe {
    target: String,
    timeout: Duration,
}

impl HttpProxyProbe {
    /// Probes `target` with the default timeout.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self::with_timeout(target, DEFAULT_PROBE_TIMEOUT)
    }

    /// Probes `target`, giving up after `timeout`.
    #[must_use]
    pub fn with_timeout(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ProxyProbe for HttpProxyProbe {
    #[instrument(level = "debug", skip(self), fields(target = %self.target))]
    async fn probe(&self, address: &str) -> Result<(), ProxyError> {
        let unreachable = |reason: String| ProxyError::Unreachable {
            address: address.to_string(),
            reason,
        };

        let route = Proxy::all(ProxyEndpoint::new(address).proxy_url())
            .map_err(|e| unreachable(e.to_string()))?;
        let client = Client::builder()
            .proxy(route)
            .timeout(self.timeout)
            .user_agent(user_agent::probe_user_agent())
            .build()
            .map_err(|e| unreachable(e.to_string()))?;

        let response = client
            .get(&self.target)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;
        let status = response.status();
        debug!(status = status.as_u16(), "probe answered");

        if status.is_success() {
            Ok(())
        } else {
            Err(ProxyError::BadStatus {
                address: address.to_string(),
                status: status.as_u16(),
            })
        }
    }
}
