//! The Core: the broker's lifecycle controller. Owns the shared state, binds
//! the listener, starts the worker pool, and tears it down on shutdown.

use crate::config::CoreConfig;
use crate::error::{CoreError, Result, WorkerId};
use crate::{acceptor, reader, router};
use groundcontrol_core::flag::ShutdownFlag;
use groundcontrol_core::queue::EventQueue;
use groundcontrol_core::satellite::SatelliteSet;
use groundcontrol_core::subscription::SubscriptionIndex;
use std::net::TcpListener;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// The Core's macro state. Only `Clean -> Running` (via `start`) and
/// `Running -> Clean` (via a clean `shutdown`) are legal transitions;
/// `Unclean` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    Clean,
    Running,
    Unclean,
}

struct Workers {
    acceptor: JoinHandle<()>,
    reader: JoinHandle<()>,
    routers: Vec<JoinHandle<()>>,
}

/// A pub/sub broker for a satellite swarm: one listener, one Reader, and a
/// pool of routers sharing a satellite set, subscription index, and event
/// queue.
pub struct Core {
    config: CoreConfig,
    state: Mutex<CoreState>,
    satellites: Arc<SatelliteSet>,
    subscriptions: Arc<SubscriptionIndex>,
    queue: Arc<EventQueue>,
    shutdown: ShutdownFlag,
    next_satellite_id: Arc<AtomicU64>,
    workers: Mutex<Option<Workers>>,
}

impl Core {
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config: config.clamped(),
            state: Mutex::new(CoreState::Clean),
            satellites: Arc::new(SatelliteSet::new()),
            subscriptions: Arc::new(SubscriptionIndex::new()),
            queue: Arc::new(EventQueue::new()),
            shutdown: ShutdownFlag::new(),
            next_satellite_id: Arc::new(AtomicU64::new(0)),
            workers: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> CoreState {
        *self.state.lock().expect("core state lock poisoned")
    }

    /// Current fleet size. Mostly useful for tests and diagnostics: the
    /// count can change the instant after this call returns.
    #[must_use]
    pub fn satellite_count(&self) -> usize {
        self.satellites.len()
    }

    /// Bind the listener, unset the shutdown flag, and start the Acceptor,
    /// Reader, and router pool. Fails if the Core is not `Clean`.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock().expect("core state lock poisoned");
        if *state != CoreState::Clean {
            return Err(CoreError::InvalidState);
        }

        let listener = TcpListener::bind(&self.config.bind_addr).map_err(|source| {
            CoreError::BindFailed {
                addr: self.config.bind_addr.clone(),
                source,
            }
        })?;

        self.shutdown.unset();

        let acceptor = acceptor::spawn(
            listener,
            Arc::clone(&self.satellites),
            self.shutdown.clone(),
            Arc::clone(&self.next_satellite_id),
            self.config.accept_poll_timeout,
        );

        let reader = reader::spawn(
            Arc::clone(&self.satellites),
            Arc::clone(&self.subscriptions),
            Arc::clone(&self.queue),
            self.shutdown.clone(),
            self.config.reader_poll_timeout,
        );

        let routers = (0..self.config.router_count)
            .map(|index| {
                router::spawn(
                    index,
                    Arc::clone(&self.satellites),
                    Arc::clone(&self.subscriptions),
                    Arc::clone(&self.queue),
                    self.shutdown.clone(),
                    self.config.router_poll_timeout,
                )
            })
            .collect();

        *self.workers.lock().expect("workers lock poisoned") = Some(Workers {
            acceptor,
            reader,
            routers,
        });
        *state = CoreState::Running;
        info!(bind_addr = %self.config.bind_addr, routers = self.config.router_count, "core started");
        Ok(())
    }

    /// Set the shutdown flag, wake every waiting router, give workers a
    /// grace period to observe it, then join each with a bounded timeout.
    /// Transitions to `Clean` (restart permitted) only if every worker
    /// joined; otherwise to the terminal `Unclean` state.
    pub fn shutdown(&self) -> Result<()> {
        let Some(workers) = self.workers.lock().expect("workers lock poisoned").take() else {
            return Err(CoreError::InvalidState);
        };

        self.shutdown.set();
        self.queue.notify_shutdown();
        std::thread::sleep(self.config.shutdown_grace);

        let join_timeout = self.config.worker_join_timeout;
        let mut unjoined = Vec::new();

        let acceptor_joined = join_with_timeout(workers.acceptor, join_timeout).is_ok();
        if !acceptor_joined {
            unjoined.push(WorkerId::Acceptor);
        }

        let reader_joined = join_with_timeout(workers.reader, join_timeout).is_ok();
        if !reader_joined {
            unjoined.push(WorkerId::Reader);
        }

        let mut all_routers_joined = true;
        for (index, handle) in workers.routers.into_iter().enumerate() {
            if join_with_timeout(handle, join_timeout).is_err() {
                all_routers_joined = false;
                unjoined.push(WorkerId::Router(index));
            }
        }

        // The listener itself closes via `Drop` once the acceptor's worker
        // closure returns, which a successful join already confirms.
        if reader_joined && all_routers_joined {
            self.satellites.clear();
        }

        let mut state = self.state.lock().expect("core state lock poisoned");
        if unjoined.is_empty() {
            *state = CoreState::Clean;
            info!("core shut down cleanly");
            Ok(())
        } else {
            *state = CoreState::Unclean;
            warn!(?unjoined, "core failed to join all workers during shutdown");
            Err(CoreError::ShutdownFailed { unjoined })
        }
    }
}

/// Poll `handle.is_finished()` at a short fixed interval until either the
/// thread finishes or `timeout` elapses, then join it only once finished
/// (so the join itself never blocks). On timeout the handle is dropped: the
/// thread keeps running, detached, and the caller records it as unjoined.
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> std::result::Result<(), ()> {
    const POLL_STEP: Duration = Duration::from_millis(5);

    let deadline = Instant::now() + timeout;
    loop {
        if handle.is_finished() {
            let _ = handle.join();
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(());
        }
        std::thread::sleep(POLL_STEP.min(timeout));
    }
}
