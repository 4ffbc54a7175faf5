//! End-to-end scenarios driven against a real `Core` over loopback TCP,
//! using plain `std::net::TcpStream` satellites. These are the literal
//! S1-S4 and S6 scenarios; S5 (the wire-layout literal byte check) lives
//! with the codec's own unit tests in `groundcontrol-core`.

use bytes::Bytes;
use groundcontrol::config::CoreConfig;
use groundcontrol::supervisor::Core;
use groundcontrol_core::codec;
use groundcontrol_core::event::Event;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
// Comfortably longer than the test config's own poll timeouts below, so a
// control event or EOF is guaranteed to have been observed by the next tick.
const SETTLE: Duration = Duration::from_millis(200);

/// A `CoreConfig` with short poll timeouts so tests settle quickly instead
/// of riding the full 500ms production defaults.
fn fast_config(bind_addr: String) -> CoreConfig {
    CoreConfig {
        accept_poll_timeout: Duration::from_millis(20),
        reader_poll_timeout: Duration::from_millis(20),
        router_poll_timeout: Duration::from_millis(20),
        shutdown_grace: Duration::from_millis(50),
        worker_join_timeout: Duration::from_millis(200),
        ..CoreConfig::with_bind_addr(bind_addr)
    }
}

fn start_core() -> (Core, String) {
    let port = portpicker::pick_unused_port().expect("no free port");
    let addr = format!("127.0.0.1:{port}");
    let core = Core::new(fast_config(addr.clone()));
    core.start().expect("core starts");
    // Give the Acceptor a moment to actually be polling the listener.
    std::thread::sleep(Duration::from_millis(50));
    (core, addr)
}

fn connect(addr: &str) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("satellite connects");
    stream
        .set_read_timeout(Some(RECV_TIMEOUT))
        .expect("set read timeout");
    stream
}

fn send_event(stream: &mut TcpStream, event: &Event) {
    let encoded = codec::encode(event);
    let len = u32::try_from(encoded.len()).unwrap();
    stream.write_all(&len.to_le_bytes()).expect("write frame header");
    stream.write_all(&encoded).expect("write frame body");
    stream.flush().expect("flush");
}

fn send_register(stream: &mut TcpStream, target_type: &[u8], unregister: bool) {
    let verb: &[u8] = if unregister { b"unregister" } else { b"register" };
    let event = Event::new()
        .with_type(Bytes::copy_from_slice(verb))
        .with_property(Bytes::from_static(b"type"), Bytes::copy_from_slice(target_type));
    send_event(stream, &event);
}

/// Try to read one framed event within the stream's read timeout. Returns
/// `None` on a timeout (used to assert "receives nothing").
fn try_recv_event(stream: &mut TcpStream) -> Option<Event> {
    let mut header = [0u8; 4];
    if stream.read_exact(&mut header).is_err() {
        return None;
    }
    let len = u32::from_le_bytes(header) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).ok()?;
    codec::decode(&payload).ok()
}

fn assert_no_event(stream: &mut TcpStream) {
    stream
        .set_read_timeout(Some(Duration::from_millis(300)))
        .expect("set short read timeout");
    let got = try_recv_event(stream);
    stream
        .set_read_timeout(Some(RECV_TIMEOUT))
        .expect("restore read timeout");
    assert!(got.is_none(), "expected no event, got {got:?}");
}

/// S1: A subscribes to `temp`. B sends a `temp` event. A receives it
/// exactly once; B receives nothing.
#[test]
fn s1_type_scoped_delivery() {
    let (core, addr) = start_core();

    let mut a = connect(&addr);
    send_register(&mut a, b"temp", false);
    std::thread::sleep(SETTLE);

    let mut b = connect(&addr);
    let reading = Event::new()
        .with_type(Bytes::from_static(b"temp"))
        .with_property(Bytes::from_static(b"v"), Bytes::from_static(b"23"));
    send_event(&mut b, &reading);

    let received = try_recv_event(&mut a).expect("A receives the temp event");
    assert_eq!(received.event_type(), Some(&b"temp"[..]));
    assert_eq!(received.property(b"v"), Some(&b"23"[..]));

    assert_no_event(&mut a);
    assert_no_event(&mut b);

    core.shutdown().expect("clean shutdown");
}

/// S2: A subscribes to `all` and receives a `motion` event; after
/// unsubscribing from `all`, a second `motion` event is not delivered.
#[test]
fn s2_universal_subscription_then_unsubscribe() {
    let (core, addr) = start_core();

    let mut a = connect(&addr);
    send_register(&mut a, b"all", false);
    std::thread::sleep(SETTLE);

    let mut b = connect(&addr);
    send_event(&mut b, &Event::new().with_type(Bytes::from_static(b"motion")));

    let received = try_recv_event(&mut a).expect("A receives the motion event");
    assert_eq!(received.event_type(), Some(&b"motion"[..]));

    send_register(&mut a, b"all", true);
    std::thread::sleep(SETTLE);

    send_event(&mut b, &Event::new().with_type(Bytes::from_static(b"motion")));
    assert_no_event(&mut a);

    core.shutdown().expect("clean shutdown");
}

/// S3: A subscribed to both `temp` and `all` receives exactly one copy of
/// a `temp` event (deduplicated fan-out).
#[test]
fn s3_dedup_across_all_and_type_subscription() {
    let (core, addr) = start_core();

    let mut a = connect(&addr);
    send_register(&mut a, b"temp", false);
    send_register(&mut a, b"all", false);
    std::thread::sleep(SETTLE);

    let mut b = connect(&addr);
    send_event(&mut b, &Event::new().with_type(Bytes::from_static(b"temp")));

    let received = try_recv_event(&mut a).expect("A receives exactly one copy");
    assert_eq!(received.event_type(), Some(&b"temp"[..]));
    assert_no_event(&mut a);

    core.shutdown().expect("clean shutdown");
}

/// S4: closing a satellite's write half prunes it from the fleet within
/// one Reader tick.
#[test]
fn s4_eof_prunes_satellite() {
    let (core, addr) = start_core();

    let a = connect(&addr);
    std::thread::sleep(SETTLE);
    assert_eq!(core.satellite_count(), 1);

    drop(a);
    std::thread::sleep(SETTLE + Duration::from_millis(500));
    assert_eq!(core.satellite_count(), 0);

    core.shutdown().expect("clean shutdown");
}

/// S6: start/shutdown/start all succeed; a second start without an
/// intervening shutdown fails with `InvalidState`.
#[test]
fn s6_restart_after_clean_shutdown_succeeds() {
    let port = portpicker::pick_unused_port().expect("no free port");
    let addr = format!("127.0.0.1:{port}");
    let core = Core::new(fast_config(addr));

    core.start().expect("first start succeeds");
    assert!(core.start().is_err(), "start on a Running core is InvalidState");

    core.shutdown().expect("first shutdown succeeds");
    core.start().expect("restart after clean shutdown succeeds");
    core.shutdown().expect("second shutdown succeeds");
}
