//! The subscription index: event type -> ordered list of subscribed
//! satellites, with exact-match lookup only. Type strings are never
//! prefix- or content-matched, so a plain hash map is sufficient here.

use crate::guarded::Guarded;
use crate::satellite::SatelliteId;
use bytes::Bytes;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// The distinguished event type whose subscriber list receives every data
/// event, regardless of that event's own type.
pub const ALL: &[u8] = b"all";

struct Index {
    by_type: HashMap<Bytes, SmallVec<[SatelliteId; 4]>>,
}

impl Index {
    fn new() -> Self {
        let mut by_type = HashMap::new();
        by_type.insert(Bytes::from_static(ALL), SmallVec::new());
        Self { by_type }
    }
}

/// Guarded subscription index. `all` always exists as a key, possibly with
/// an empty subscriber list.
pub struct SubscriptionIndex {
    inner: Guarded<Index>,
}

impl Default for SubscriptionIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Guarded::new(Index::new()),
        }
    }

    /// Subscribe `satellite` to `event_type`, creating the list if absent.
    /// A satellite appears at most once per type.
    pub fn register(&self, satellite: SatelliteId, event_type: Bytes) {
        let mut index = self.inner.lock();
        let list = index.by_type.entry(event_type).or_default();
        if !list.contains(&satellite) {
            list.push(satellite);
        }
    }

    /// Unsubscribe `satellite` from `event_type`. A no-op if no list exists
    /// for the type, or the satellite was never a member.
    pub fn unregister(&self, satellite: SatelliteId, event_type: &[u8]) {
        let mut index = self.inner.lock();
        if let Some(list) = index.by_type.get_mut(event_type) {
            if let Some(pos) = list.iter().position(|s| *s == satellite) {
                list.remove(pos);
            }
        }
    }

    /// Remove `satellite` from every subscription list (used when a
    /// satellite is pruned on EOF or send failure).
    pub fn remove_everywhere(&self, satellite: SatelliteId) {
        let mut index = self.inner.lock();
        for list in index.by_type.values_mut() {
            if let Some(pos) = list.iter().position(|s| *s == satellite) {
                list.remove(pos);
            }
        }
    }

    /// The deduplicated union of `all` subscribers and `event_type`
    /// subscribers.
    #[must_use]
    pub fn recipients_for(&self, event_type: &[u8]) -> Vec<SatelliteId> {
        let index = self.inner.lock();
        let mut out: Vec<SatelliteId> = index
            .by_type
            .get(ALL)
            .map(|l| l.to_vec())
            .unwrap_or_default();

        if event_type != ALL {
            if let Some(list) = index.by_type.get(event_type) {
                for &satellite in list {
                    if !out.contains(&satellite) {
                        out.push(satellite);
                    }
                }
            }
        }
        out
    }

    /// The `all`-only recipient set, used for data events with no type.
    #[must_use]
    pub fn all_recipients(&self) -> Vec<SatelliteId> {
        self.inner
            .lock()
            .by_type
            .get(ALL)
            .map(|l| l.to_vec())
            .unwrap_or_default()
    }
}
