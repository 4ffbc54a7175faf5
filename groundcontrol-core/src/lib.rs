//! Ground Control Core
//!
//! Protocol-agnostic kernel for the Ground Control satellite-swarm broker:
//! - the wire codec (`codec`, `event`)
//! - the guarded-datum and signal primitives (`guarded`, `flag`, `queue`)
//! - the satellite set and subscription index (`satellite`, `subscription`)
//! - raw-socket poll/recv/send helpers shared by the Acceptor and Reader (`net`)

pub mod codec;
pub mod error;
pub mod event;
pub mod flag;
pub mod guarded;
pub mod net;
pub mod queue;
pub mod received_event;
pub mod satellite;
pub mod subscription;

pub mod prelude {
    pub use crate::codec;
    pub use crate::error::{CodecError, Result as CodecResult};
    pub use crate::event::{Event, Properties};
    pub use crate::flag::ShutdownFlag;
    pub use crate::queue::EventQueue;
    pub use crate::received_event::ReceivedEvent;
    pub use crate::satellite::{SatelliteEntry, SatelliteId, SatelliteSet};
    pub use crate::subscription::SubscriptionIndex;
}
