use gl_util::{Code, Error, Layer, Result};

const ENC_STRING: u8 = 0b00 << 6;
const ENC_BYTES: u8 = 0b01 << 6;
const ENC_BYTE: u8 = 0b10 << 6;
const ENC_U32: u8 = 0b11 << 6;
const ENC_MASK: u8 = 0b11 << 6;
const SEMANTIC_MASK: u8 = 0b0011_1111;

/// Semantic header codes, carried in the low six bits of the identifier
/// byte. `BODY`/`END_BODY` never reach [`Header`] directly; the decoder
/// binds them to [`crate::packet::Packet::body`] instead.
pub mod semantic {
	pub const NAME: u8 = 0x01;
	pub const TYPE: u8 = 0x02;
	pub const LENGTH: u8 = 0x03;
	pub const DESCRIPTION: u8 = 0x05;
	pub const BODY: u8 = 0x08;
	pub const END_BODY: u8 = 0x09;
	pub const CONNECTION_ID: u8 = 0x0B;
	/// Vendor-defined: the peer's hostname, carried as a byte string.
	pub const HOSTNAME: u8 = 0x04;
}

/// A decoded (or to-be-encoded) header, one variant per semantic code this
/// codec understands. Unrecognized identifiers decode to `Unknown` rather
/// than being dropped, keeping the round-trip lossless.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Header {
	Name(String),
	Type(Vec<u8>),
	Length(u32),
	Description(String),
	ConnectionId(u32),
	Hostname(String),
	Unknown { id: u8, value: RawValue },
}

/// The four header wire encodings, independent of what they mean.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawValue {
	Str(String),
	Bytes(Vec<u8>),
	Byte(u8),
	U32(u32),
}

impl Header {
	fn wire_id(&self) -> u8 {
		match self {
			Header::Name(_) => ENC_STRING | semantic::NAME,
			Header::Type(_) => ENC_BYTES | semantic::TYPE,
			Header::Length(_) => ENC_U32 | semantic::LENGTH,
			Header::Description(_) => ENC_STRING | semantic::DESCRIPTION,
			Header::ConnectionId(_) => ENC_U32 | semantic::CONNECTION_ID,
			Header::Hostname(_) => ENC_BYTES | semantic::HOSTNAME,
			Header::Unknown { id, .. } => *id,
		}
	}

	/// Total wire size of this header, including its identifier byte.
	pub fn wire_len(&self) -> usize {
		match self {
			Header::Name(s) | Header::Description(s) => 3 + utf16be_payload_len(s),
			Header::Type(b) => 4 + b.len(),
			Header::Length(_) | Header::ConnectionId(_) => 1 + 4,
			Header::Hostname(s) => 4 + s.len(),
			Header::Unknown { value, .. } => match value {
				RawValue::Str(s) => 3 + utf16be_payload_len(s),
				RawValue::Bytes(b) => 4 + b.len(),
				RawValue::Byte(_) => 2,
				RawValue::U32(_) => 5,
			},
		}
	}

	pub fn encode(&self, out: &mut Vec<u8>) {
		out.push(self.wire_id());

		match self {
			Header::Name(s) | Header::Description(s) => encode_utf16be(s, out),
			Header::Type(b) => encode_bytes(b, out),
			Header::Length(n) | Header::ConnectionId(n) => out.extend_from_slice(&n.to_be_bytes()),
			Header::Hostname(s) => encode_bytes(s.as_bytes(), out),
			Header::Unknown { value, .. } => match value {
				RawValue::Str(s) => encode_utf16be(s, out),
				RawValue::Bytes(b) => encode_bytes(b, out),
				RawValue::Byte(b) => out.push(*b),
				RawValue::U32(n) => out.extend_from_slice(&n.to_be_bytes()),
			},
		}
	}

	/// Decodes one header starting at `buf[0]`. Returns the header and the
	/// number of bytes consumed.
	///
	/// Callers must intercept `BODY`/`END_BODY` identifiers before reaching
	/// this function — the body binds to the packet's `body`/`eob` fields,
	/// not to a header, per the wire format.
	pub fn decode(buf: &[u8]) -> Result<(Header, usize)> {
		let &id = buf.first().ok_or_else(|| protocol_err("truncated header: missing identifier byte"))?;

		let enc = id & ENC_MASK;
		let sem = id & SEMANTIC_MASK;
		let rest = &buf[1..];

		if enc == ENC_BYTES && (sem == semantic::BODY || sem == semantic::END_BODY) {
			return Err(protocol_err("BODY/END_BODY must be parsed by the packet decoder"));
		}

		match enc {
			ENC_STRING => {
				let (s, consumed) = decode_utf16be(rest)?;

				Ok((Self::from_semantic(sem, id, RawValue::Str(s)), 1 + consumed))
			}
			ENC_BYTES => {
				let (b, consumed) = decode_bytes(rest)?;

				Ok((Self::from_semantic(sem, id, RawValue::Bytes(b)), 1 + consumed))
			}
			ENC_BYTE => {
				let &b = rest.first().ok_or_else(|| protocol_err("truncated single-byte header"))?;

				Ok((Self::from_semantic(sem, id, RawValue::Byte(b)), 2))
			}
			ENC_U32 => {
				let n = u32::from_be_bytes(rest.get(..4).ok_or_else(|| protocol_err("truncated 32-bit header"))?.try_into().unwrap());

				Ok((Self::from_semantic(sem, id, RawValue::U32(n)), 5))
			}
			_ => unreachable!("2-bit mask yields four cases"),
		}
	}

	fn from_semantic(sem: u8, id: u8, value: RawValue) -> Header {
		match (sem, value) {
			(semantic::NAME, RawValue::Str(s)) => Header::Name(s),
			(semantic::DESCRIPTION, RawValue::Str(s)) => Header::Description(s),
			(semantic::TYPE, RawValue::Bytes(b)) => Header::Type(b),
			(semantic::HOSTNAME, RawValue::Bytes(b)) => Header::Hostname(String::from_utf8_lossy(&b).into_owned()),
			(semantic::LENGTH, RawValue::U32(n)) => Header::Length(n),
			(semantic::CONNECTION_ID, RawValue::U32(n)) => Header::ConnectionId(n),
			(_, value) => Header::Unknown { id, value },
		}
	}
}

fn protocol_err(message: impl Into<String>) -> Error {
	Error::new(Layer::Gl, Code::GL_ERR_PROTOCOL, message)
}

fn read_u16(buf: &[u8]) -> Result<u16> {
	Ok(u16::from_be_bytes(buf.get(..2).ok_or_else(|| protocol_err("truncated length field"))?.try_into().unwrap()))
}

fn utf16be_payload_len(s: &str) -> usize {
	2 * (s.encode_utf16().count() + 1)
}

fn encode_utf16be(s: &str, out: &mut Vec<u8>) {
	let total = 3 + utf16be_payload_len(s);
	out.extend_from_slice(&(total as u16).to_be_bytes());

	for unit in s.encode_utf16() {
		out.extend_from_slice(&unit.to_be_bytes());
	}

	out.extend_from_slice(&[0, 0]);
}

fn decode_utf16be(buf: &[u8]) -> Result<(String, usize)> {
	let total = read_u16(buf)? as usize;
	let payload_len = total.checked_sub(5).ok_or_else(|| protocol_err("string header length underflows framing"))?;

	if payload_len % 2 != 0 {
		return Err(protocol_err("odd UTF-16BE payload length"));
	}

	let units = payload_len / 2;
	let data = buf.get(2..2 + 2 * units).ok_or_else(|| protocol_err("truncated UTF-16BE payload"))?;

	let code_units: Vec<u16> = data.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();

	let s = String::from_utf16(&code_units).map_err(|_| protocol_err("invalid UTF-16BE string header"))?;

	// Skip the two-byte NUL terminator.
	Ok((s, 2 + 2 * units + 2))
}

fn encode_bytes(data: &[u8], out: &mut Vec<u8>) {
	let total = 4 + data.len();
	out.extend_from_slice(&(total as u16).to_be_bytes());
	out.extend_from_slice(data);
	out.push(0);
}

fn decode_bytes(buf: &[u8]) -> Result<(Vec<u8>, usize)> {
	let total = read_u16(buf)? as usize;
	let payload_len = total.checked_sub(4).ok_or_else(|| protocol_err("byte-string header length underflows framing"))?;

	let data = buf.get(2..2 + payload_len).ok_or_else(|| protocol_err("truncated byte-string payload"))?.to_vec();

	// Skip the one-byte NUL terminator.
	Ok((data, 2 + payload_len + 1))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn name_header_round_trips() {
		let h = Header::Name("a.bin".to_owned());

		let mut buf = Vec::new();
		h.encode(&mut buf);

		assert_eq!(buf.len(), h.wire_len());

		let (decoded, consumed) = Header::decode(&buf).unwrap();
		assert_eq!(consumed, buf.len());
		assert_eq!(decoded, h);
	}

	#[test]
	fn length_header_round_trips() {
		let h = Header::Length(24_000);

		let mut buf = Vec::new();
		h.encode(&mut buf);

		assert_eq!(buf, vec![ENC_U32 | semantic::LENGTH, 0x00, 0x00, 0x5D, 0xC0]);

		let (decoded, consumed) = Header::decode(&buf).unwrap();
		assert_eq!(consumed, 5);
		assert_eq!(decoded, h);
	}

	#[test]
	fn hostname_header_round_trips() {
		let h = Header::Hostname("peer-a".to_owned());

		let mut buf = Vec::new();
		h.encode(&mut buf);

		let (decoded, consumed) = Header::decode(&buf).unwrap();
		assert_eq!(consumed, buf.len());
		assert_eq!(decoded, h);
	}
}
