use std::collections::{HashSet, VecDeque};
use std::net::SocketAddrV4;
use std::time::Duration;

use gl_socket::{enumerate_interfaces, Socket};
use gl_util::Result;

use crate::message::{DeviceType, Message, MessageType, Peer, PeerId};
use crate::{DEFAULT_DEDUP_CAPACITY, GL_SERVER_MAIN_PORT, QUERY_TIMEOUT_MS};

/// One discovery outcome, delivered to the caller's callback as a round
/// progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
	PeerDiscovered(Peer),
	End,
}

/// A dedup set bounded to `capacity` entries: once full, the oldest peer id
/// is evicted to make room for the newest, so a very long-running discovery
/// loop can't grow this without bound.
struct BoundedSeen {
	capacity: usize,
	order: VecDeque<PeerId>,
	set: HashSet<PeerId>,
}

impl BoundedSeen {
	fn new(capacity: usize) -> Self {
		Self { capacity: capacity.max(1), order: VecDeque::new(), set: HashSet::new() }
	}

	/// Returns `true` if `id` had not been seen yet.
	fn insert(&mut self, id: PeerId) -> bool {
		if !self.set.insert(id) {
			return false;
		}

		self.order.push_back(id);

		if self.order.len() > self.capacity {
			if let Some(oldest) = self.order.pop_front() {
				self.set.remove(&oldest);
			}
		}

		true
	}
}

/// Runs one broadcast discovery round: sends a `Discovery` query out every
/// local interface's broadcast address, then collects replies until
/// [`QUERY_TIMEOUT_MS`] elapses on each, deduplicating by peer id across the
/// whole round against a bounded cache of [`DEFAULT_DEDUP_CAPACITY`] entries.
/// Emits `End` once every interface has been queried.
pub fn query(peer_id: PeerId, device_type: DeviceType, hostname: String, on_event: impl FnMut(DiscoveryEvent)) -> Result<()> {
	query_with_capacity(peer_id, device_type, hostname, DEFAULT_DEDUP_CAPACITY, on_event)
}

/// Same as [`query`], with a caller-chosen bound on the dedup cache instead
/// of [`DEFAULT_DEDUP_CAPACITY`].
pub fn query_with_capacity(peer_id: PeerId, device_type: DeviceType, hostname: String, dedup_capacity: usize, mut on_event: impl FnMut(DiscoveryEvent)) -> Result<()> {
	let interfaces = enumerate_interfaces()?;
	let mut seen = BoundedSeen::new(dedup_capacity);

	let query = Message::new(MessageType::Discovery, peer_id, device_type, hostname);
	let payload = query.encode();

	for iface in &interfaces {
		let mut socket = Socket::new();
		socket.set_address(None, 0);
		socket.setup_udp(false, Some(Duration::from_millis(QUERY_TIMEOUT_MS)))?;

		let target = SocketAddrV4::new(iface.broadcast, GL_SERVER_MAIN_PORT);
		socket.sendto(&payload, target)?;

		collect_replies(&socket, peer_id, &mut seen, &mut on_event)?;
	}

	on_event(DiscoveryEvent::End);
	Ok(())
}

fn collect_replies(socket: &Socket, self_id: PeerId, seen: &mut BoundedSeen, on_event: &mut impl FnMut(DiscoveryEvent)) -> Result<()> {
	let mut buf = [0u8; 512];

	loop {
		let (n, addr) = match socket.recvfrom(&mut buf, false) {
			Ok(v) => v,
			Err(err) if err.code == gl_util::Code::TIMEOUT => return Ok(()),
			Err(err) => {
				log::warn!("discovery recvfrom failed, continuing until timeout: {err}");
				continue;
			}
		};

		let Ok(reply) = Message::decode(&buf[..n]) else {
			continue;
		};

		if reply.ty != MessageType::Discovery || reply.peer_id == self_id || !seen.insert(reply.peer_id) {
			continue;
		}

		on_event(DiscoveryEvent::PeerDiscovered(Peer {
			peer_id: reply.peer_id,
			device_type: String::from_utf8_lossy(&reply.device_type).into_owned(),
			hostname: reply.hostname,
			addr,
		}));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dedup_tracks_peer_ids_across_a_round() {
		let mut seen = BoundedSeen::new(DEFAULT_DEDUP_CAPACITY);
		assert!(seen.insert(*b"12345678"));
		assert!(!seen.insert(*b"12345678"));
	}

	#[test]
	fn dedup_evicts_oldest_once_capacity_is_exceeded() {
		let mut seen = BoundedSeen::new(2);

		assert!(seen.insert(*b"peer0001"));
		assert!(seen.insert(*b"peer0002"));
		assert!(seen.insert(*b"peer0003")); // evicts peer0001

		// peer0001 was evicted, so it's reported as unseen again.
		assert!(seen.insert(*b"peer0001")); // evicts peer0002

		// peer0003 is still within the window and stays deduplicated.
		assert!(!seen.insert(*b"peer0003"));
	}
}
