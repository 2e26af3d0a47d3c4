use std::net::SocketAddrV4;
use std::path::Path;

use gl_socket::Socket;
use gl_util::{Code, Error, Layer, Result};

use crate::header::{semantic, Header};
use crate::opcode::Opcode;

/// Protocol version byte sent in the CONNECT fixed parameters.
pub const OBEX_PROTO_VERSION: u8 = 0x10;
/// Upper bound on a packet's declared length, per the wire format.
pub const OBEX_MAX_PACKET_SIZE: u16 = 65535;
/// Default cap on a single PUT body chunk.
pub const OBEX_MAX_FILE_CHUNK: usize = 8000;

const ENC_BYTES_BODY: u8 = 0b01 << 6;

/// The CONNECT fixed parameters: protocol version, flags, max packet size.
/// Carried by CONNECT itself and by SUCCESS/UNAUTHORIZED when they answer
/// a CONNECT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectParams {
	pub version: u8,
	pub flags: u8,
	pub max_packet_size: u16,
}

impl ConnectParams {
	pub fn new(max_packet_size: u16) -> Self {
		Self { version: OBEX_PROTO_VERSION, flags: 0, max_packet_size }
	}
}

/// A decoded or to-be-encoded OBEX packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
	pub opcode: Opcode,
	pub params: Option<ConnectParams>,
	pub headers: Vec<Header>,
	pub body: Option<Vec<u8>>,
	/// Set when the body arrived as `END_BODY` (the final chunk of a PUT).
	pub eob: bool,
}

impl Packet {
	pub fn new(opcode: Opcode) -> Self {
		Self { opcode, params: None, headers: Vec::new(), body: None, eob: false }
	}

	/// The sentinel packet returned by [`decode`] when the input is
	/// malformed, per the wire format's INVALID result.
	pub fn invalid() -> Self {
		Self::new(Opcode(0x00))
	}

	pub fn is_invalid(&self) -> bool {
		self.opcode == Opcode(0x00)
	}

	pub fn with_params(mut self, params: ConnectParams) -> Self {
		self.params = Some(params);
		self
	}

	pub fn with_header(mut self, header: Header) -> Self {
		self.headers.push(header);
		self
	}

	pub fn with_body(mut self, body: Vec<u8>, eob: bool) -> Self {
		self.body = Some(body);
		self.eob = eob;
		self
	}

	pub fn name(&self) -> Option<&str> {
		self.headers.iter().find_map(|h| match h {
			Header::Name(s) => Some(s.as_str()),
			_ => None,
		})
	}

	pub fn length(&self) -> Option<u32> {
		self.headers.iter().find_map(|h| match h {
			Header::Length(n) => Some(*n),
			_ => None,
		})
	}

	pub fn hostname(&self) -> Option<&str> {
		self.headers.iter().find_map(|h| match h {
			Header::Hostname(s) => Some(s.as_str()),
			_ => None,
		})
	}

	fn total_size(&self) -> usize {
		let params = if self.params.is_some() { 4 } else { 0 };
		let headers: usize = self.headers.iter().map(Header::wire_len).sum();
		let body = self.body.as_ref().map_or(0, |b| b.len() + 3);

		3 + params + headers + body
	}

	/// Encodes this packet into a freshly allocated buffer.
	pub fn encode(&self) -> Vec<u8> {
		let total = self.total_size();
		let mut out = Vec::with_capacity(total);

		out.push(self.opcode.byte());
		out.extend_from_slice(&(total as u16).to_be_bytes());

		if let Some(params) = self.params {
			out.push(params.version);
			out.push(params.flags);
			out.extend_from_slice(&params.max_packet_size.to_be_bytes());
		}

		for header in &self.headers {
			header.encode(&mut out);
		}

		if let Some(body) = &self.body {
			let id = ENC_BYTES_BODY | if self.eob { semantic::END_BODY } else { semantic::BODY };

			out.push(id);
			out.extend_from_slice(&((body.len() + 3) as u16).to_be_bytes());
			out.extend_from_slice(body);
		}

		out
	}

	/// Decodes a packet from `buf`. `has_params` indicates whether the
	/// caller expects the CONNECT fixed parameter block (set for CONNECT
	/// and for any response to a CONNECT). Returns [`Packet::invalid`] on
	/// any length mismatch or unrecognized encoding, matching the wire
	/// format's INVALID sentinel behavior.
	pub fn decode(buf: &[u8], has_params: bool) -> Packet {
		match Self::try_decode(buf, has_params) {
			Ok(packet) => packet,
			Err(err) => {
				log::warn!("Discarding malformed OBEX packet: {err}");
				Packet::invalid()
			}
		}
	}

	fn try_decode(buf: &[u8], has_params: bool) -> Result<Packet> {
		let &opcode_byte = buf.first().ok_or_else(|| protocol_err("empty packet"))?;
		let length = u16::from_be_bytes(buf.get(1..3).ok_or_else(|| protocol_err("truncated packet length"))?.try_into().unwrap());

		if length > OBEX_MAX_PACKET_SIZE {
			return Err(protocol_err(format!("declared length {length} exceeds OBEX_MAX_PACKET_SIZE")));
		}

		if length as usize != buf.len() {
			return Err(protocol_err(format!("declared length {length} does not match buffer of {}", buf.len())));
		}

		let mut pos = 3;
		let mut packet = Packet::new(Opcode(opcode_byte));

		if has_params {
			let params = buf.get(pos..pos + 4).ok_or_else(|| protocol_err("truncated CONNECT parameters"))?;

			packet.params = Some(ConnectParams { version: params[0], flags: params[1], max_packet_size: u16::from_be_bytes([params[2], params[3]]) });

			pos += 4;
		}

		while pos < buf.len() {
			let &id = buf.get(pos).ok_or_else(|| protocol_err("truncated header identifier"))?;
			let sem = id & 0b0011_1111;
			let enc = id & 0b1100_0000;

			if enc == ENC_BYTES_BODY && (sem == semantic::BODY || sem == semantic::END_BODY) {
				let total = u16::from_be_bytes(buf.get(pos + 1..pos + 3).ok_or_else(|| protocol_err("truncated BODY length"))?.try_into().unwrap()) as usize;

				let payload_len = total.checked_sub(3).ok_or_else(|| protocol_err("BODY length underflows framing"))?;

				let start = pos + 3;
				let data = buf.get(start..start + payload_len).ok_or_else(|| protocol_err("truncated BODY payload"))?;

				packet.body = Some(data.to_vec());
				packet.eob = sem == semantic::END_BODY;

				pos += 3 + payload_len;
				continue;
			}

			let (header, consumed) = Header::decode(&buf[pos..])?;
			packet.headers.push(header);
			pos += consumed;
		}

		Ok(packet)
	}

	pub fn send(&self, socket: &Socket) -> Result<()> {
		socket.send(&self.encode())?;
		Ok(())
	}

	/// Peeks the 3-byte header to learn the packet's total length,
	/// allocates an exact buffer, reads it in full (wait-all), then
	/// decodes it.
	pub fn recv(socket: &Socket, has_params: bool) -> Result<Packet> {
		let mut head = [0u8; 3];
		socket.recv(&mut head, true, false)?;

		let length = u16::from_be_bytes([head[1], head[2]]) as usize;

		if length < 3 {
			return Ok(Packet::invalid());
		}

		let mut buf = vec![0u8; length];
		socket.recv(&mut buf, false, true)?;

		Ok(Packet::decode(&buf, has_params))
	}

	pub fn sendto(&self, socket: &Socket, peer: SocketAddrV4) -> Result<()> {
		socket.sendto(&self.encode(), peer)?;
		Ok(())
	}

	/// Receives one datagram and decodes it. If `expect` is set and the
	/// decoded opcode doesn't match, the packet is discarded as invalid.
	pub fn recvfrom(socket: &Socket, has_params: bool, expect: Option<Opcode>) -> Result<(Packet, SocketAddrV4)> {
		let mut buf = vec![0u8; OBEX_MAX_PACKET_SIZE as usize];
		let (n, peer) = socket.recvfrom(&mut buf, false)?;

		buf.truncate(n);
		let packet = Packet::decode(&buf, has_params);

		match expect {
			Some(op) if packet.opcode != op => Ok((Packet::invalid(), peer)),
			_ => Ok((packet, peer)),
		}
	}
}

fn protocol_err(message: impl Into<String>) -> Error {
	Error::new(Layer::Gl, Code::GL_ERR_INVALID_PACKET, message)
}

fn basename(path: &Path) -> String {
	path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Builds a CONNECT packet advertising `max_packet_size`, with NAME/LENGTH/
/// HOSTNAME headers describing the file this session is about to send.
pub fn connect(max_packet_size: u16, path: &Path, size: u64, hostname: &str) -> Packet {
	Packet::new(Opcode::CONNECT)
		.with_params(ConnectParams::new(max_packet_size))
		.with_header(Header::Name(basename(path)))
		.with_header(Header::Length(size as u32))
		.with_header(Header::Hostname(hostname.to_owned()))
}

pub fn disconnect() -> Packet {
	Packet::new(Opcode::DISCONNECT)
}

/// Builds a SUCCESS-final response. `params` is set when this answers a
/// CONNECT, echoing the server's chosen max packet size.
pub fn success(params: Option<ConnectParams>) -> Packet {
	let mut packet = Packet::new(Opcode::SUCCESS);
	packet.params = params;
	packet
}

pub fn continue_() -> Packet {
	Packet::new(Opcode::CONTINUE)
}

/// Builds an UNAUTHORIZED response. `params` is set when this answers a
/// CONNECT, same as [`success`] — the reply to a CONNECT always carries the
/// fixed parameter block, accepted or not.
pub fn unauthorized(params: Option<ConnectParams>) -> Packet {
	let mut packet = Packet::new(Opcode::UNAUTHORIZED);
	packet.params = params;
	packet
}

/// Builds a PUT packet carrying one body chunk. `eob` marks the final
/// chunk (`END_BODY`), which also sets the opcode's final bit.
pub fn put(chunk: Vec<u8>, eob: bool) -> Packet {
	let opcode = if eob { Opcode::PUT_FINAL } else { Opcode::PUT };
	Packet::new(opcode).with_body(chunk, eob)
}

pub fn get(path: &Path) -> Packet {
	Packet::new(Opcode::GET_FINAL).with_header(Header::Name(basename(path)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn connect_round_trips() {
		let packet = connect(65535, Path::new("a.bin"), 10, "host-a");
		let buf = packet.encode();

		assert_eq!(buf.len(), packet.total_size());

		let decoded = Packet::decode(&buf, true);
		assert_eq!(decoded, packet);
	}

	#[test]
	fn put_chunk_round_trips() {
		let packet = put(vec![1, 2, 3, 4], false);
		let buf = packet.encode();

		let decoded = Packet::decode(&buf, false);
		assert_eq!(decoded, packet);
		assert_eq!(decoded.opcode, Opcode::PUT);
		assert!(!decoded.opcode.is_final());
	}

	#[test]
	fn put_final_empty_body_round_trips() {
		let packet = put(Vec::new(), true);
		let buf = packet.encode();

		let decoded = Packet::decode(&buf, false);
		assert_eq!(decoded.body, Some(Vec::new()));
		assert!(decoded.eob);
		assert!(decoded.opcode.is_final());
	}

	// Note: the wire length field is 16 bits wide (max 65535), which equals
	// `OBEX_MAX_PACKET_SIZE` itself, so a length that overflows both the
	// field *and* the constant can't be constructed on the wire; the guard
	// in `try_decode` exists for callers that lower `OBEX_MAX_PACKET_SIZE`
	// below the field's natural range. The length-vs-buffer mismatch path
	// below covers the reachable "reject a bad declared length" case.

	#[test]
	fn length_mismatch_decodes_to_invalid() {
		let mut buf = vec![Opcode::DISCONNECT.byte()];
		buf.extend_from_slice(&10u16.to_be_bytes());
		// Declares 10 bytes but the buffer is shorter.

		let decoded = Packet::decode(&buf, false);
		assert!(decoded.is_invalid());
	}
}
