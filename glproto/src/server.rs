use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gl_socket::Socket;
use gl_util::Result;

use crate::message::{DeviceType, Message, MessageType, PeerId};
use crate::{GL_SERVER_MAIN_PORT, SERVER_TIMEOUT_MS};

/// Runs the discovery responder: binds a UDP server socket on
/// [`GL_SERVER_MAIN_PORT`] and answers every `Discovery` query that isn't
/// our own, until `running` is cleared.
///
/// A query a peer sent to itself (same `peer_id`) is not answered — this
/// keeps loopback broadcast rounds from reporting a host to itself.
pub fn serve(peer_id: PeerId, device_type: DeviceType, hostname: String, running: Arc<AtomicBool>) -> Result<()> {
	let mut socket = Socket::new();
	socket.set_address(None, GL_SERVER_MAIN_PORT);
	socket.setup_udp(true, Some(Duration::from_millis(SERVER_TIMEOUT_MS)))?;

	let mut buf = [0u8; 512];

	while running.load(Ordering::Relaxed) {
		let (n, peer) = match socket.recvfrom(&mut buf, false) {
			Ok(v) => v,
			Err(err) if err.code == gl_util::Code::TIMEOUT => continue,
			Err(err) => {
				log::warn!("discovery responder recvfrom failed, continuing: {err}");
				continue;
			}
		};

		let Ok(query) = Message::decode(&buf[..n]) else {
			continue;
		};

		if query.ty != MessageType::Discovery || query.peer_id == peer_id {
			continue;
		}

		let reply = Message::new(MessageType::Discovery, peer_id, device_type, hostname.clone());
		let _ = socket.sendto(&reply.encode(), peer);
	}

	Ok(())
}
