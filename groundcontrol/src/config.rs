//! Configuration for a [`Core`](crate::supervisor::Core).
//!
//! No CLI, no environment variables: the embedding program builds a
//! `CoreConfig` directly. Every timeout is clamped at construction to a
//! fixed upper bound so the shutdown-observation guarantee can never be
//! configured away by an overly long poll interval.

use std::time::Duration;

/// Default listen port, matching the home-automation satellite swarm's
/// historical default.
pub const DEFAULT_PORT: u16 = 51100;

/// Default router pool size.
pub const DEFAULT_ROUTER_COUNT: usize = 4;

const MAX_POLL_TIMEOUT: Duration = Duration::from_millis(500);
const MAX_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);
const MAX_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Lifecycle and tuning knobs for a `Core`.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Address the public listener binds to, e.g. `"0.0.0.0:51100"`.
    pub bind_addr: String,
    /// Number of router workers in the pool.
    pub router_count: usize,
    /// Bounded wait the Acceptor uses between shutdown-flag checks.
    pub accept_poll_timeout: Duration,
    /// Bounded wait the Reader uses between shutdown-flag checks.
    pub reader_poll_timeout: Duration,
    /// Bounded wait each router uses on an empty queue between
    /// shutdown-flag checks.
    pub router_poll_timeout: Duration,
    /// Grace period `shutdown` waits after setting the flag, before
    /// attempting to join workers.
    pub shutdown_grace: Duration,
    /// Per-worker join timeout during shutdown.
    pub worker_join_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            router_count: DEFAULT_ROUTER_COUNT,
            accept_poll_timeout: Duration::from_millis(500),
            reader_poll_timeout: Duration::from_millis(500),
            router_poll_timeout: Duration::from_millis(500),
            shutdown_grace: Duration::from_secs(1),
            worker_join_timeout: Duration::from_millis(500),
        }
    }
}

impl CoreConfig {
    /// A config bound to an explicit address (host:port), otherwise using
    /// the defaults. Handy for tests that need an ephemeral port.
    #[must_use]
    pub fn with_bind_addr(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            ..Self::default()
        }
    }

    /// Clamp every timeout to its fixed upper bound, and floor the router
    /// count at 1. Called once by `Core::new`.
    #[must_use]
    pub(crate) fn clamped(mut self) -> Self {
        self.router_count = self.router_count.max(1);
        self.accept_poll_timeout = self.accept_poll_timeout.min(MAX_POLL_TIMEOUT);
        self.reader_poll_timeout = self.reader_poll_timeout.min(MAX_POLL_TIMEOUT);
        self.router_poll_timeout = self.router_poll_timeout.min(MAX_POLL_TIMEOUT);
        self.shutdown_grace = self.shutdown_grace.min(MAX_SHUTDOWN_GRACE);
        self.worker_join_timeout = self.worker_join_timeout.min(MAX_JOIN_TIMEOUT);
        self
    }
}
