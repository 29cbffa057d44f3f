//! User-Agent strings for browser handles and proxy probes.
//!
//! Handles present as a current desktop browser, picked at random per handle
//! so successive attempts do not share a fingerprint. Probes identify the tool.

use rand::seq::SliceRandom;

const DESKTOP_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
];

/// A desktop browser User-Agent drawn at random.
#[must_use]
pub(crate) fn random_browser_user_agent() -> &'static str {
    DESKTOP_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

/// User-Agent for proxy health probes.
#[must_use]
pub(crate) fn probe_user_agent() -> String {
    format!("joblo/{} (proxy-probe)", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_browser_user_agent_comes_from_pool() {
        for _ in 0..20 {
            let ua = random_browser_user_agent();
            assert!(DESKTOP_USER_AGENTS.contains(&ua));
            assert!(ua.starts_with("Mozilla/5.0"));
        }
    }

    #[test]
    fn test_probe_user_agent_carries_version() {
        let ua = probe_user_agent();
        assert!(ua.starts_with("joblo/"));
        assert!(ua.contains(env!("CARGO_PKG_VERSION")));
    }
}
