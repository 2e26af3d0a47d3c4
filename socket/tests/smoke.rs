use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use gl_socket::{enumerate_interfaces, Socket};

/// `enumerate_interfaces` must never error, and whatever it returns must be
/// well-formed (non-empty interface name, a real broadcast address) even in
/// a sandbox with only a loopback interface and no broadcast-capable NICs.
#[test]
fn enumerate_interfaces_smoke() {
	let interfaces = enumerate_interfaces().unwrap();

	for iface in &interfaces {
		assert!(!iface.name.is_empty());
		assert_ne!(iface.broadcast, Ipv4Addr::UNSPECIFIED);
	}
}

#[test]
fn tcp_listener_accepts_a_loopback_connection() {
	let mut server = Socket::new();
	server.set_address(Some(Ipv4Addr::LOCALHOST), 0);
	server.setup_tcp(true).unwrap();

	let port = server.address().port();

	let handle = std::thread::spawn(move || {
		let mut client = Socket::new();
		client.set_address_raw(Ipv4Addr::LOCALHOST, port);
		client.connect().unwrap();
		client.send(b"hello").unwrap();
		let _ = client.shutdown();
	});

	let conn = server.accept().unwrap();

	let mut buf = [0u8; 5];
	conn.recv(&mut buf, false, true).unwrap();
	assert_eq!(&buf, b"hello");

	handle.join().unwrap();
}

#[test]
fn udp_sendto_recvfrom_round_trips_on_loopback() {
	let mut responder = Socket::new();
	responder.set_address(Some(Ipv4Addr::LOCALHOST), 0);
	responder.setup_udp(true, Some(Duration::from_secs(2))).unwrap();
	let responder_port = responder.address().port();

	let mut querier = Socket::new();
	querier.set_address(None, 0);
	querier.setup_udp(false, Some(Duration::from_secs(2))).unwrap();

	let target = SocketAddrV4::new(Ipv4Addr::LOCALHOST, responder_port);
	querier.sendto(b"ping", target).unwrap();

	let mut buf = [0u8; 4];
	let (n, _peer) = responder.recvfrom(&mut buf, false).unwrap();
	assert_eq!(&buf[..n], b"ping");
}

#[test]
fn udp_recvfrom_reports_timeout_rather_than_blocking_forever() {
	let mut socket = Socket::new();
	socket.set_address(Some(Ipv4Addr::LOCALHOST), 0);
	socket.setup_udp(true, Some(Duration::from_millis(50))).unwrap();

	let mut buf = [0u8; 4];
	let err = socket.recvfrom(&mut buf, false).unwrap_err();
	assert_eq!(err.code, gl_util::Code::TIMEOUT);
}
