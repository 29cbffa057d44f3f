//! Skips wiremock-backed tests in sandboxes without loopback sockets.

use std::net::TcpListener;

use wiremock::MockServer;

const REQUIRE_ENV: &str = "JOBLO_REQUIRE_SOCKET_TESTS";

fn sockets_required() -> bool {
    std::env::var(REQUIRE_ENV)
        .is_ok_and(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a mock server, or returns `None` when 127.0.0.1 cannot be bound.
///
/// With `JOBLO_REQUIRE_SOCKET_TESTS=1` an unbindable loopback fails the test
/// instead of skipping it.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl std::future::Future<Output = Option<MockServer>> {
    let caller = std::panic::Location::caller();
    let bindable = TcpListener::bind("127.0.0.1:0").is_ok();
    if !bindable {
        assert!(
            !sockets_required(),
            "loopback unavailable at {caller} but {REQUIRE_ENV} is set"
        );
        eprintln!("loopback unavailable at {caller}; skipping socket-bound test");
    }
    async move {
        if bindable {
            Some(MockServer::start().await)
        } else {
            None
        }
    }
}
