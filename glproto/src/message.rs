use std::net::SocketAddrV4;

use gl_util::{Code, Error, Layer, Result};

/// The fixed head: `G`, `L`, a type char, and a reserved NUL.
pub const HEAD_LEN: usize = 6;
pub const PEER_ID_LEN: usize = 8;
pub const DEVICE_TYPE_LEN: usize = 3;

pub type PeerId = [u8; PEER_ID_LEN];
pub type DeviceType = [u8; DEVICE_TYPE_LEN];

/// The message's role, carried in the third head byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
	Discovery,
	Url,
	File,
}

impl MessageType {
	pub fn byte(self) -> u8 {
		match self {
			MessageType::Discovery => b'D',
			MessageType::Url => b'U',
			MessageType::File => b'F',
		}
	}

	pub fn from_byte(b: u8) -> Option<Self> {
		match b {
			b'D' => Some(MessageType::Discovery),
			b'U' => Some(MessageType::Url),
			b'F' => Some(MessageType::File),
			_ => None,
		}
	}
}

/// Returns whether `buf` starts with a valid glproto head: `G`, `L`, a
/// non-zero type byte, and a NUL in position 3.
pub fn head_valid(buf: &[u8]) -> bool {
	buf.len() >= HEAD_LEN && buf[0] == b'G' && buf[1] == b'L' && buf[2] != 0 && buf[3] == 0
}

/// A decoded (or to-be-encoded) glproto message: the envelope plus a
/// peer id, device type, and hostname.
///
/// The envelope carries a separator byte before each field (`spec.md` §4.3);
/// this implementation treats those as reserved-zero on encode and skips
/// them at their fixed offsets on decode without validating their value,
/// as the wire format's Open Question on their role directs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
	pub ty: MessageType,
	pub peer_id: PeerId,
	pub device_type: DeviceType,
	pub hostname: String,
}

impl Message {
	pub fn new(ty: MessageType, peer_id: PeerId, device_type: DeviceType, hostname: impl Into<String>) -> Self {
		Self { ty, peer_id, device_type, hostname: hostname.into() }
	}

	pub fn encode(&self) -> Vec<u8> {
		let hostname = self.hostname.as_bytes();
		let total = HEAD_LEN + 1 + PEER_ID_LEN + 1 + DEVICE_TYPE_LEN + 1 + 1 + hostname.len();

		let mut out = Vec::with_capacity(total);

		out.push(b'G');
		out.push(b'L');
		out.push(self.ty.byte());
		out.push(0);
		out.extend_from_slice(&(total as u16).to_be_bytes());

		out.push(0); // separator
		out.extend_from_slice(&self.peer_id);
		out.push(0); // separator
		out.extend_from_slice(&self.device_type);
		out.push(0); // separator

		out.push(hostname.len().min(u8::MAX as usize) as u8);
		out.extend_from_slice(&hostname[..hostname.len().min(u8::MAX as usize)]);

		out
	}

	pub fn decode(buf: &[u8]) -> Result<Message> {
		if !head_valid(buf) {
			return Err(protocol_err("invalid glproto head"));
		}

		let ty = MessageType::from_byte(buf[2]).ok_or_else(|| protocol_err("unrecognized glproto message type"))?;

		let declared = u16::from_be_bytes([buf[4], buf[5]]) as usize;

		if declared != buf.len() {
			return Err(protocol_err(format!("declared length {declared} does not match datagram of {} bytes", buf.len())));
		}

		let mut pos = HEAD_LEN;
		pos += 1; // separator

		let peer_id: PeerId = buf.get(pos..pos + PEER_ID_LEN).ok_or_else(|| protocol_err("truncated peer id"))?.try_into().unwrap();
		pos += PEER_ID_LEN;
		pos += 1; // separator

		let device_type: DeviceType = buf.get(pos..pos + DEVICE_TYPE_LEN).ok_or_else(|| protocol_err("truncated device type"))?.try_into().unwrap();
		pos += DEVICE_TYPE_LEN;
		pos += 1; // separator

		let hostname_len = *buf.get(pos).ok_or_else(|| protocol_err("truncated hostname length"))? as usize;
		pos += 1;

		let hostname_bytes = buf.get(pos..pos + hostname_len).ok_or_else(|| protocol_err("truncated hostname"))?;
		let hostname = String::from_utf8_lossy(hostname_bytes).into_owned();

		Ok(Message { ty, peer_id, device_type, hostname })
	}
}

/// One discovered peer: its device type, hostname, and where it answered from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peer {
	pub peer_id: PeerId,
	pub device_type: String,
	pub hostname: String,
	pub addr: SocketAddrV4,
}

fn protocol_err(message: impl Into<String>) -> Error {
	Error::new(Layer::Gl, Code::GL_ERR_PROTOCOL, message)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn discovery_message_round_trips() {
		let msg = Message::new(MessageType::Discovery, *b"12345678", *b"Lnx", "hostA");
		let buf = msg.encode();

		assert!(head_valid(&buf));
		assert_eq!(&buf[0..4], b"GLD\0");

		let decoded = Message::decode(&buf).unwrap();
		assert_eq!(decoded, msg);
	}

	#[test]
	fn invalid_head_is_rejected() {
		let buf = [b'X', b'L', b'D', 0, 0, 0];
		assert!(!head_valid(&buf));
		assert!(Message::decode(&buf).is_err());
	}
}
