//! Round-robin proxy leasing with lazy health refresh.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{ProxyEndpoint, ProxyHealth, ProxyProbe};

/// Probing stops once this many endpoints are healthy.
pub const DEFAULT_MIN_HEALTHY: usize = 5;

#[derive(Debug, Default)]
struct PoolState {
    endpoints: Vec<ProxyEndpoint>,
    /// Indices into `endpoints`, in probe order.
    healthy: Vec<usize>,
    cursor: usize,
    leased: HashSet<String>,
}

/// A pool of proxy endpoints shared by retry loops.
///
/// All mutation happens under one async lock, so a refresh in progress
/// blocks other callers of [`ProxyPool::next`] until it finishes.
pub struct ProxyPool {
    probe: Arc<dyn ProxyProbe>,
    min_healthy: usize,
    state: Mutex<PoolState>,
}

impl ProxyPool {
    /// Creates a pool over `addresses`, all initially unprobed.
    #[must_use]
    pub fn new(addresses: Vec<String>, probe: Arc<dyn ProxyProbe>) -> Self {
        Self::with_min_healthy(addresses, probe, DEFAULT_MIN_HEALTHY)
    }

    /// Creates a pool with a custom probing stop threshold.
    #[must_use]
    pub fn with_min_healthy(
        addresses: Vec<String>,
        probe: Arc<dyn ProxyProbe>,
        min_healthy: usize,
    ) -> Self {
        let mut seen = HashSet::new();
        let endpoints = addresses
            .into_iter()
            .filter(|address| seen.insert(address.clone()))
            .map(ProxyEndpoint::new)
            .collect();
        Self {
            probe,
            min_healthy: min_healthy.max(1),
            state: Mutex::new(PoolState {
                endpoints,
                ..PoolState::default()
            }),
        }
    }

    /// Leases the next healthy endpoint, refreshing first if none are healthy.
    ///
    /// Returns `None` when no candidate passes a probe.
    #[instrument(level = "debug", skip(self))]
    pub async fn next(&self) -> Option<ProxyEndpoint> {
        let mut state = self.state.lock().await;
        if state.healthy.is_empty() {
            self.refresh(&mut state).await;
        }
        if state.healthy.is_empty() {
            warn!(candidates = state.endpoints.len(), "no healthy proxy available");
            return None;
        }

        let count = state.healthy.len();
        let start = state.cursor % count;
        let free = (0..count)
            .map(|offset| (start + offset) % count)
            .find(|&slot| {
                let index = state.healthy[slot];
                !state.leased.contains(&state.endpoints[index].address)
            });
        let slot = free.unwrap_or_else(|| {
            warn!(healthy = count, "every healthy proxy is leased; sharing one");
            start
        });

        state.cursor = slot + 1;
        let endpoint = state.endpoints[state.healthy[slot]].clone();
        state.leased.insert(endpoint.address.clone());
        debug!(proxy = %endpoint.address, "proxy leased");
        Some(endpoint)
    }

    /// Returns a leased endpoint to the pool.
    pub async fn release(&self, endpoint: &ProxyEndpoint) {
        let mut state = self.state.lock().await;
        state.leased.remove(&endpoint.address);
    }

    /// Snapshot of every endpoint and its health.
    pub async fn endpoints(&self) -> Vec<ProxyEndpoint> {
        self.state.lock().await.endpoints.clone()
    }

    /// Number of endpoints currently eligible for leasing.
    pub async fn healthy_count(&self) -> usize {
        self.state.lock().await.healthy.len()
    }

    async fn refresh(&self, state: &mut PoolState) {
        info!(candidates = state.endpoints.len(), target = self.min_healthy, "refreshing proxy pool");
        state.healthy.clear();
        state.cursor = 0;

        for index in 0..state.endpoints.len() {
            if state.healthy.len() >= self.min_healthy {
                break;
            }
            let address = state.endpoints[index].address.clone();
            let result = self.probe.probe(&address).await;

            let endpoint = &mut state.endpoints[index];
            endpoint.last_checked_at = Some(SystemTime::now());
            match result {
                Ok(()) => {
                    endpoint.health = ProxyHealth::Healthy;
                    state.healthy.push(index);
                    debug!(proxy = %address, "proxy healthy");
                }
                Err(e) => {
                    endpoint.health = ProxyHealth::Unhealthy;
                    debug!(proxy = %address, error = %e, "proxy unhealthy");
                }
            }
        }

        info!(healthy = state.healthy.len(), "proxy pool refreshed");
    }
}
