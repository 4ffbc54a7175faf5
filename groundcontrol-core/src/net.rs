//! Raw-socket helpers shared by the Acceptor and the Reader: a bounded-
//! timeout readiness wait over an arbitrary set of file descriptors, plus
//! thin wrappers around the raw `recv`/`send` syscalls.
//!
//! Neither `std` nor an async runtime exposes a synchronous, bounded-timeout
//! wait over an arbitrary set of sockets, so this is built directly on
//! `libc::poll`. Raw descriptor handling is `unsafe` internally but the
//! public surface is safe.
//!
//! Ground Control targets Unix platforms for the Core's socket-multiplexing
//! layer; see `DESIGN.md` for the platform-scope decision.

#![allow(unsafe_code)]

#[cfg(not(unix))]
compile_error!(
    "groundcontrol-core's Reader/Acceptor socket multiplexing is implemented on top of \
     libc::poll and currently supports Unix targets only; see DESIGN.md for the scope note."
);

use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Wait for any of `fds` to become readable, or until `timeout` elapses.
///
/// Returns the subset of `fds` that are ready. An empty result means the
/// wait timed out with nothing ready -- callers treat that as a no-op tick,
/// not an error.
///
/// A `poll()` call interrupted by a signal (`EINTR`) is retried internally
/// against the remaining time budget rather than surfaced as an error.
pub fn poll_readable(fds: &[RawFd], timeout: Duration) -> io::Result<Vec<RawFd>> {
    if fds.is_empty() {
        std::thread::sleep(timeout);
        return Ok(Vec::new());
    }

    let mut pollfds: Vec<libc::pollfd> = fds
        .iter()
        .map(|&fd| libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();

    let mut remaining = timeout;
    loop {
        let started = std::time::Instant::now();
        let timeout_ms = remaining.as_millis().min(i32::MAX as u128) as i32;

        // SAFETY: `pollfds` is a valid, exclusively-borrowed slice of
        // `libc::pollfd` for the duration of this call, matching poll(2)'s contract.
        let rc = unsafe {
            libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, timeout_ms)
        };

        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                let elapsed = started.elapsed();
                remaining = remaining.saturating_sub(elapsed);
                if remaining.is_zero() {
                    return Ok(Vec::new());
                }
                continue;
            }
            return Err(err);
        }

        let ready = pollfds
            .iter()
            .filter(|p| p.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
            .map(|p| p.fd)
            .collect();
        return Ok(ready);
    }
}

/// Wait for a single descriptor (the listener) to become readable.
pub fn poll_one_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    Ok(!poll_readable(&[fd], timeout)?.is_empty())
}

/// Read exactly `buf.len()` bytes from `fd`, retrying on `EINTR`.
///
/// Returns `Ok(0)` only when the peer has performed an orderly shutdown
/// before any bytes of this call were read (a clean EOF). A partial read
/// followed by EOF is a truncation and surfaces as an `UnexpectedEof` error,
/// since the caller (the Reader) always knows the exact length to expect
/// from the frame header it already consumed.
pub fn recv_exact(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    let mut read = 0usize;
    while read < buf.len() {
        // SAFETY: `buf[read..]` is a valid, writable region of the given length.
        let n = unsafe {
            libc::recv(
                fd,
                buf[read..].as_mut_ptr().cast(),
                buf.len() - read,
                0,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if n == 0 {
            if read == 0 {
                return Ok(0);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed mid-frame",
            ));
        }
        read += n as usize;
    }
    Ok(read)
}

/// Send the entirety of `buf` on `fd`, retrying on `EINTR` and partial
/// writes. The caller is responsible for holding any per-socket send lock
/// needed to keep a whole frame's `send_all` calls from interleaving with
/// another thread's writes to the same socket.
pub fn send_all(fd: RawFd, buf: &[u8]) -> io::Result<()> {
    let mut sent = 0usize;
    while sent < buf.len() {
        // SAFETY: `buf[sent..]` is a valid, readable region of the given length.
        let n = unsafe {
            libc::send(
                fd,
                buf[sent..].as_ptr().cast(),
                buf.len() - sent,
                libc::MSG_NOSIGNAL,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        sent += n as usize;
    }
    Ok(())
}
