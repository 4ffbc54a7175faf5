//! The Acceptor: brings new satellites into the fleet.

#![allow(unsafe_code)]

use groundcontrol_core::flag::ShutdownFlag;
use groundcontrol_core::net::poll_one_readable;
use groundcontrol_core::satellite::{SatelliteEntry, SatelliteId, SatelliteSet};
use std::io;
use std::net::TcpListener;
use std::ops::ControlFlow;
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Spawn the Acceptor thread.
///
/// `listener` must already be bound and listening. It is moved into the
/// worker and closed (by `Drop`) when the worker returns, which is how the
/// Supervisor observes a clean exit via a successful join.
pub fn spawn(
    listener: TcpListener,
    satellites: Arc<SatelliteSet>,
    shutdown: ShutdownFlag,
    next_id: Arc<AtomicU64>,
    poll_timeout: Duration,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("groundcontrol-acceptor".into())
        .spawn(move || run(&listener, &satellites, &shutdown, &next_id, poll_timeout))
        .expect("failed to spawn acceptor thread")
}

fn run(
    listener: &TcpListener,
    satellites: &SatelliteSet,
    shutdown: &ShutdownFlag,
    next_id: &AtomicU64,
    poll_timeout: Duration,
) {
    let _ = listener.set_nonblocking(true);
    let fd = listener.as_raw_fd();

    while !shutdown.is_set() {
        match poll_one_readable(fd, poll_timeout) {
            Ok(true) => {
                if accept_one(listener, satellites, next_id).is_break() {
                    return;
                }
            }
            Ok(false) => {} // bounded-timeout no-op tick
            Err(err) if is_transient(&err) => {
                debug!(error = %err, "transient error polling listener, retrying");
            }
            Err(err) => {
                warn!(error = %err, "listener poll failed fatally, acceptor exiting");
                return;
            }
        }
    }
    info!("acceptor observed shutdown flag, exiting");
}

/// Accept one connection. Returns [`ControlFlow::Break`] when the listener
/// error was fatal (not transient), telling `run` to stop the Acceptor.
fn accept_one(
    listener: &TcpListener,
    satellites: &SatelliteSet,
    next_id: &AtomicU64,
) -> ControlFlow<()> {
    match listener.accept() {
        Ok((stream, peer_addr)) => {
            enable_nodelay(&stream);
            let id: SatelliteId = next_id.fetch_add(1, Ordering::SeqCst);
            satellites.insert(id, SatelliteEntry::new(peer_addr, stream));
            info!(satellite_id = id, %peer_addr, "accepted new satellite");
            ControlFlow::Continue(())
        }
        Err(err) if is_transient(&err) => {
            debug!(error = %err, "transient accept error, retrying");
            ControlFlow::Continue(())
        }
        Err(err) => {
            warn!(error = %err, "accept failed fatally, acceptor exiting");
            ControlFlow::Break(())
        }
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

/// Disable Nagle's algorithm on a newly accepted satellite socket: borrow
/// the raw fd into a `socket2::Socket` just long enough to set the option,
/// then `mem::forget` it so the original owner still closes the fd exactly
/// once.
fn enable_nodelay(stream: &std::net::TcpStream) {
    let fd = stream.as_raw_fd();
    let sock = unsafe { socket2::Socket::from_raw_fd(fd) };
    if let Err(err) = sock.set_nodelay(true) {
        debug!(error = %err, "failed to set TCP_NODELAY on satellite socket");
    }
    std::mem::forget(sock);
}
