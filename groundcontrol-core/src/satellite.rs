//! The satellite set: the authoritative mapping from connected satellite
//! handles to their peer address, guarded by a single lock.

use crate::guarded::Guarded;
use hashbrown::HashMap;
use std::net::{SocketAddr, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::Arc;
use std::sync::Mutex;

/// Stable identifier for one connected satellite, assigned by the Acceptor
/// at accept time. An integer handle, rather than the socket object itself,
/// keeps the satellite set and subscription index cheap to key and hash.
pub type SatelliteId = u64;

/// Everything the Core needs to know about one connected satellite.
///
/// `stream` is shared: routers take this `Arc<Mutex<_>>` to serialize
/// concurrent sends onto the same socket. `fd` caches the raw descriptor
/// so the Reader can poll/recv directly via raw syscalls without
/// contending for that send lock.
#[derive(Clone)]
pub struct SatelliteEntry {
    pub peer_addr: SocketAddr,
    pub stream: Arc<Mutex<TcpStream>>,
    pub fd: RawFd,
}

impl SatelliteEntry {
    #[must_use]
    pub fn new(peer_addr: SocketAddr, stream: TcpStream) -> Self {
        let fd = stream.as_raw_fd();
        Self {
            peer_addr,
            stream: Arc::new(Mutex::new(stream)),
            fd,
        }
    }
}

/// Guarded map of connected satellites. Writers: the Acceptor (insert), the
/// Reader (remove on EOF/error), the Router pool (remove on send failure).
#[derive(Default)]
pub struct SatelliteSet {
    entries: Guarded<HashMap<SatelliteId, SatelliteEntry>>,
}

impl SatelliteSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Guarded::new(HashMap::new()),
        }
    }

    pub fn insert(&self, id: SatelliteId, entry: SatelliteEntry) {
        self.entries.lock().insert(id, entry);
    }

    /// Remove a satellite. Returns the removed entry, if it was still a
    /// member (it may already have been pruned by a concurrent removal).
    pub fn remove(&self, id: SatelliteId) -> Option<SatelliteEntry> {
        self.entries.lock().remove(&id)
    }

    pub fn get(&self, id: SatelliteId) -> Option<SatelliteEntry> {
        self.entries.lock().get(&id).cloned()
    }

    /// A stable snapshot of every member's id and entry, taken under the
    /// set's lock, for the Reader's per-tick poll set.
    ///
    /// Each entry is cloned rather than reduced to its bare `fd`: the clone
    /// keeps the underlying `Arc<Mutex<TcpStream>>` alive for as long as the
    /// caller holds the snapshot, even if a concurrent prune (EOF, or a
    /// Router's send failure) drops the satellite set's own reference and
    /// the id is removed from the map. Without that, the descriptor could
    /// close and be recycled by a brand-new accepted connection mid-tick,
    /// and the Reader would then read the new connection's bytes under the
    /// old, already-pruned `SatelliteId`.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(SatelliteId, SatelliteEntry)> {
        self.entries
            .lock()
            .iter()
            .map(|(&id, entry)| (id, entry.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Drop every entry, releasing its `Arc<Mutex<TcpStream>>`. Once the
    /// Reader and every router have joined, this is the last outstanding
    /// reference, so the underlying sockets close as the streams drop.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};

    fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn insert_get_remove_round_trip() {
        let (_client, server) = pair();
        let peer_addr = server.peer_addr().unwrap();
        let set = SatelliteSet::new();
        let entry = SatelliteEntry::new(peer_addr, server);

        assert_eq!(set.len(), 0);
        set.insert(1, entry);
        assert_eq!(set.len(), 1);
        assert!(set.get(1).is_some());

        let snapshot = set.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, 1);

        let removed = set.remove(1);
        assert!(removed.is_some());
        assert_eq!(set.len(), 0);
        assert!(set.remove(1).is_none());
    }

    /// A snapshot entry keeps the stream's `Arc` alive even after the
    /// satellite is removed from the set, so its fd cannot be recycled
    /// while the snapshot is still held.
    #[test]
    fn snapshot_entry_outlives_removal_from_the_set() {
        let (_client, server) = pair();
        let peer_addr = server.peer_addr().unwrap();
        let set = SatelliteSet::new();
        set.insert(1, SatelliteEntry::new(peer_addr, server));

        let snapshot = set.snapshot();
        assert!(set.remove(1).is_some());

        // The entry's Arc<Mutex<TcpStream>> is still reachable through the
        // snapshot, so the stream (and its fd) has not yet been dropped.
        let (_, entry) = &snapshot[0];
        assert_eq!(Arc::strong_count(&entry.stream), 1);
    }
}
