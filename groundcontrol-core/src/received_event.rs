//! A decoded event paired with the satellite that sent it.

use crate::event::Event;
use crate::satellite::SatelliteId;

/// Produced by the Reader, consumed by the Router pool.
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub event: Event,
    pub source: SatelliteId,
}

impl ReceivedEvent {
    #[must_use]
    pub const fn new(event: Event, source: SatelliteId) -> Self {
        Self { event, source }
    }
}
