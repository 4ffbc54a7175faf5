//! The Reader: multiplexes reads across every connected satellite and
//! publishes decoded events to the shared queue.

use groundcontrol_core::codec;
use groundcontrol_core::flag::ShutdownFlag;
use groundcontrol_core::net::{poll_readable, recv_exact};
use groundcontrol_core::queue::EventQueue;
use groundcontrol_core::received_event::ReceivedEvent;
use groundcontrol_core::satellite::{SatelliteEntry, SatelliteId, SatelliteSet};
use groundcontrol_core::subscription::SubscriptionIndex;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

const FRAME_HEADER_LEN: usize = 4;

pub fn spawn(
    satellites: Arc<SatelliteSet>,
    subscriptions: Arc<SubscriptionIndex>,
    queue: Arc<EventQueue>,
    shutdown: ShutdownFlag,
    poll_timeout: Duration,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("groundcontrol-reader".into())
        .spawn(move || run(&satellites, &subscriptions, &queue, &shutdown, poll_timeout))
        .expect("failed to spawn reader thread")
}

fn run(
    satellites: &SatelliteSet,
    subscriptions: &SubscriptionIndex,
    queue: &EventQueue,
    shutdown: &ShutdownFlag,
    poll_timeout: Duration,
) {
    while !shutdown.is_set() {
        // Snapshot clones each entry's `Arc<Mutex<TcpStream>>`, so every fd
        // polled and read below stays open and un-recycled for this whole
        // tick even if a concurrent prune drops the satellite set's own
        // reference to it.
        let snapshot = satellites.snapshot();
        if snapshot.is_empty() {
            std::thread::sleep(poll_timeout);
            continue;
        }

        let fds: Vec<RawFd> = snapshot.iter().map(|(_, entry)| entry.fd).collect();
        let ready = match poll_readable(&fds, poll_timeout) {
            Ok(ready) => ready,
            Err(err) => {
                warn!(error = %err, "poll over satellite sockets failed, retrying");
                continue;
            }
        };
        if ready.is_empty() {
            continue;
        }

        let mut batch = Vec::with_capacity(ready.len());
        for (id, entry) in &snapshot {
            if !ready.contains(&entry.fd) {
                continue;
            }
            match read_one(entry) {
                Ok(Some(event)) => batch.push(ReceivedEvent::new(event, *id)),
                Ok(None) => prune(*id, satellites, subscriptions, "peer closed connection"),
                Err(err) => prune_with_error(*id, satellites, subscriptions, &err),
            }
        }

        if !batch.is_empty() {
            queue.push_batch(batch);
        }
    }
    info!("reader observed shutdown flag, exiting");
}

/// Read one framed event off `entry`'s socket. `Ok(None)` means the peer
/// closed cleanly before sending a header. Takes the whole snapshot entry,
/// not just its fd, so the underlying stream is kept alive for the full
/// read even if the satellite is pruned elsewhere mid-call.
fn read_one(entry: &SatelliteEntry) -> std::io::Result<Option<groundcontrol_core::event::Event>> {
    let fd = entry.fd;
    let mut header = [0u8; FRAME_HEADER_LEN];
    let read = recv_exact(fd, &mut header)?;
    if read == 0 {
        return Ok(None);
    }

    let payload_len = u32::from_le_bytes(header) as usize;
    let mut payload = vec![0u8; payload_len];
    if payload_len > 0 {
        recv_exact(fd, &mut payload)?;
    }

    let event = codec::decode(&payload).map_err(|err| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())
    })?;
    Ok(Some(event))
}

fn prune(id: SatelliteId, satellites: &SatelliteSet, subscriptions: &SubscriptionIndex, reason: &str) {
    satellites.remove(id);
    subscriptions.remove_everywhere(id);
    debug!(satellite_id = id, reason, "pruned satellite");
}

fn prune_with_error(
    id: SatelliteId,
    satellites: &SatelliteSet,
    subscriptions: &SubscriptionIndex,
    err: &std::io::Error,
) {
    satellites.remove(id);
    subscriptions.remove_everywhere(id);
    warn!(satellite_id = id, error = %err, "pruned satellite after read error");
}
