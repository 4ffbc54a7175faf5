//! The Router pool: drains the event queue, interprets subscription control
//! events, and fans out data events to their subscribers.

use bytes::Bytes;
use groundcontrol_core::codec;
use groundcontrol_core::event::Event;
use groundcontrol_core::flag::ShutdownFlag;
use groundcontrol_core::net::send_all;
use groundcontrol_core::queue::EventQueue;
use groundcontrol_core::received_event::ReceivedEvent;
use groundcontrol_core::satellite::{SatelliteId, SatelliteSet};
use groundcontrol_core::subscription::SubscriptionIndex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, trace, warn};

const REGISTER: &[u8] = b"register";
const UNREGISTER: &[u8] = b"unregister";

pub fn spawn(
    index: usize,
    satellites: Arc<SatelliteSet>,
    subscriptions: Arc<SubscriptionIndex>,
    queue: Arc<EventQueue>,
    shutdown: ShutdownFlag,
    poll_timeout: Duration,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name(format!("groundcontrol-router-{index}"))
        .spawn(move || run(&satellites, &subscriptions, &queue, &shutdown, poll_timeout))
        .expect("failed to spawn router thread")
}

fn run(
    satellites: &SatelliteSet,
    subscriptions: &SubscriptionIndex,
    queue: &EventQueue,
    shutdown: &ShutdownFlag,
    poll_timeout: Duration,
) {
    loop {
        let Some(batch) = queue.drain_blocking(shutdown, poll_timeout) else {
            break;
        };
        for received in batch {
            handle_one(received, satellites, subscriptions);
        }
    }
    debug!("router observed shutdown flag, exiting");
}

fn handle_one(received: ReceivedEvent, satellites: &SatelliteSet, subscriptions: &SubscriptionIndex) {
    let ReceivedEvent { event, source } = received;

    if let Some(event_type) = event.event_type() {
        let folded = event_type.to_ascii_lowercase();
        if folded == REGISTER {
            return handle_control(event, source, subscriptions, true);
        }
        if folded == UNREGISTER {
            return handle_control(event, source, subscriptions, false);
        }
    }

    route_data_event(event, subscriptions, satellites);
}

/// Handle a `register`/`unregister` control event. The target type is read
/// byte-exactly from `properties["type"]`; only the outer event type is
/// case-folded to detect the control verb. Missing properties, or a missing
/// `type` property, silently drop the event.
fn handle_control(event: Event, source: SatelliteId, subscriptions: &SubscriptionIndex, is_register: bool) {
    let Some(properties) = event.properties() else {
        trace!(satellite_id = source, "control event missing properties, dropped");
        return;
    };
    let Some(target_type) = properties.get(b"type".as_slice()) else {
        trace!(satellite_id = source, "control event missing type property, dropped");
        return;
    };

    if is_register {
        subscriptions.register(source, target_type.clone());
        debug!(satellite_id = source, target = %String::from_utf8_lossy(target_type), "registered");
    } else {
        subscriptions.unregister(source, target_type);
        debug!(satellite_id = source, target = %String::from_utf8_lossy(target_type), "unregistered");
    }
}

/// Compute the recipient set (deduplicated `all` + exact-type subscribers)
/// and deliver one copy of the event to each.
fn route_data_event(event: Event, subscriptions: &SubscriptionIndex, satellites: &SatelliteSet) {
    let recipients = match event.event_type() {
        Some(event_type) => subscriptions.recipients_for(event_type),
        None => subscriptions.all_recipients(),
    };
    if recipients.is_empty() {
        return;
    }

    let encoded = codec::encode(&event);
    let frame = frame_with_header(&encoded);

    for recipient in recipients {
        deliver(recipient, &frame, satellites, subscriptions);
    }
}

fn frame_with_header(encoded: &Bytes) -> Vec<u8> {
    let len = u32::try_from(encoded.len()).unwrap_or(u32::MAX);
    let mut frame = Vec::with_capacity(4 + encoded.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(encoded);
    frame
}

fn deliver(recipient: SatelliteId, frame: &[u8], satellites: &SatelliteSet, subscriptions: &SubscriptionIndex) {
    let Some(entry) = satellites.get(recipient) else {
        return; // already pruned by a concurrent removal
    };
    let stream = entry.stream.lock().expect("satellite stream lock poisoned");
    if let Err(err) = send_all(entry.fd, frame) {
        drop(stream);
        warn!(satellite_id = recipient, error = %err, "send failed, pruning satellite");
        satellites.remove(recipient);
        subscriptions.remove_everywhere(recipient);
    }
}
