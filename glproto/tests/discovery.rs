use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gl_glproto::client::DiscoveryEvent;
use gl_glproto::message::{Message, MessageType};

/// The envelope itself round-trips over a loopback UDP pair, independent of
/// the higher-level client/server query machinery (which needs real
/// broadcast-capable interfaces to exercise end to end).
#[test]
fn envelope_round_trips_over_loopback_udp() {
	use std::net::UdpSocket;

	let responder = UdpSocket::bind("127.0.0.1:0").unwrap();
	let responder_addr = responder.local_addr().unwrap();

	let querier = UdpSocket::bind("127.0.0.1:0").unwrap();
	querier.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

	let query = Message::new(MessageType::Discovery, *b"querier1", *b"Lnx", "querier-host");
	querier.send_to(&query.encode(), responder_addr).unwrap();

	let mut buf = [0u8; 512];
	let (n, querier_addr) = responder.recv_from(&mut buf).unwrap();
	let decoded = Message::decode(&buf[..n]).unwrap();
	assert_eq!(decoded, query);

	let reply = Message::new(MessageType::Discovery, *b"responde", *b"Lnx", "responder-host");
	responder.send_to(&reply.encode(), querier_addr).unwrap();

	let (n, _) = querier.recv_from(&mut buf).unwrap();
	let decoded_reply = Message::decode(&buf[..n]).unwrap();
	assert_eq!(decoded_reply, reply);
}

/// A discovery round against an unreachable/empty interface set still
/// terminates with an `End` event rather than blocking forever.
#[test]
fn query_emits_end_event_eventually() {
	let _running = Arc::new(AtomicBool::new(true));

	let events = Arc::new(std::sync::Mutex::new(Vec::new()));
	let events_clone = events.clone();

	let handle = thread::spawn(move || {
		let _ = gl_glproto::query(*b"selfpeer", *b"Lnx", "self-host".to_owned(), |ev| {
			events_clone.lock().unwrap().push(ev);
		});
	});

	handle.join().unwrap();

	let events = events.lock().unwrap();
	assert!(matches!(events.last(), Some(DiscoveryEvent::End)));
}
