use std::fs::File;
use std::io::Read;
use std::net::SocketAddrV4;
use std::path::Path;

use gl_codec::{self as codec, Opcode, Packet};
use gl_socket::Socket;
use gl_util::{Code, Error, Result};

use crate::event::EventSink;
use crate::session::{FileBundle, NegotiatedChunking, SenderState};

/// Drives one outbound transfer through
/// `Idle → Connecting → Negotiating → Streaming → Disconnecting → Done`.
///
/// Opens its own socket via [`connect`]; callers that need to observe or
/// cancel the connection before this function takes over (the facade's
/// `Client::send_file`, which registers the socket for external shutdown)
/// should call [`connect`] themselves and drive the session with
/// [`run_on`] instead.
pub fn run(target: SocketAddrV4, path: &Path, hostname: &str, sink: &dyn EventSink) -> Result<()> {
	let socket = connect(target)?;
	sink.connected(target);

	let result = run_on(&socket, path, hostname, sink);

	if let Err(err) = &result {
		log::warn!("send to {target} aborted: {err}");
	}

	let _ = socket.shutdown();
	sink.disconnected(target);

	result
}

/// `Idle → Connecting`: opens and connects a stream socket to `target`.
/// Does not emit `connected` — the caller does, once it has decided what
/// else (e.g. registering the socket for cancellation) must happen first.
pub fn connect(target: SocketAddrV4) -> Result<Socket> {
	let mut socket = Socket::new();
	socket.set_address_raw(*target.ip(), target.port());
	socket.connect()?;

	Ok(socket)
}

/// Drives `Negotiating → Streaming → Disconnecting → Done` over an
/// already-connected `socket`.
pub fn run_on(socket: &Socket, path: &Path, hostname: &str, sink: &dyn EventSink) -> Result<()> {
	let mut state = SenderState::Connecting;
	let size = std::fs::metadata(path).map_err(|err| Error::gl(Code::GL_ERR_FS_SIZE, err.to_string()))?.len();
	let bundle = FileBundle::from_path(path, size);

	drive(socket, &bundle, hostname, sink, &mut state)
}

fn drive(socket: &Socket, bundle: &FileBundle, hostname: &str, sink: &dyn EventSink, state: &mut SenderState) -> Result<()> {
	*state = SenderState::Negotiating;

	codec::connect(codec::OBEX_MAX_PACKET_SIZE, &bundle.path, bundle.size, hostname).send(socket)?;
	let reply = Packet::recv(socket, true)?;

	if reply.is_invalid() {
		*state = SenderState::Error;
		return Err(Error::gl(Code::GL_ERR_INVALID_STATE_OPCODE, "CONNECT reply was malformed"));
	}

	match reply.opcode {
		Opcode::SUCCESS => sink.conn_req_resp(&bundle.basename, true),
		Opcode::UNAUTHORIZED => {
			sink.conn_req_resp(&bundle.basename, false);
			*state = SenderState::Disconnecting;
			return disconnect(socket, state);
		}
		_ => {
			*state = SenderState::Error;
			return Err(Error::gl(Code::GL_ERR_INVALID_STATE_OPCODE, "expected SUCCESS or UNAUTHORIZED after CONNECT"));
		}
	}

	let peer_max_packet_size = reply.params.map_or(codec::OBEX_MAX_PACKET_SIZE, |p| p.max_packet_size);
	let chunking = NegotiatedChunking::new(peer_max_packet_size);

	*state = SenderState::Streaming;

	let mut file = File::open(&bundle.path).map_err(|err| Error::gl(Code::GL_ERR_FS_OPEN, err.to_string()))?;
	let mut sent: u64 = 0;
	let mut chunk_index: u32 = 0;
	let mut buf = vec![0u8; chunking.chunk_size.max(1)];

	loop {
		let remaining = bundle.size - sent;
		let want = (chunking.chunk_size as u64).min(remaining) as usize;

		let n = file.read(&mut buf[..want]).map_err(|err| Error::gl(Code::GL_ERR_FS_READ, err.to_string()))?;
		let eob = sent + n as u64 >= bundle.size;

		codec::put(buf[..n].to_vec(), eob).send(socket)?;

		let ack = Packet::recv(socket, false).map_err(|err| {
			sink.put_progress(&bundle.basename, sent, bundle.size, chunk_index, n as u32);
			Error::gl(Code::ESOCKET, format!("stream closed while awaiting ack: {err}"))
		})?;

		let expect = if eob { Opcode::SUCCESS } else { Opcode::CONTINUE };

		if ack.is_invalid() || ack.opcode != expect {
			*state = SenderState::Error;
			return Err(Error::gl(Code::GL_ERR_INVALID_STATE_OPCODE, "unexpected ack while streaming"));
		}

		sent += n as u64;
		chunk_index += 1;
		sink.put_progress(&bundle.basename, sent, bundle.size, chunk_index, n as u32);

		if eob {
			sink.put_succeeded(&bundle.basename);
			break;
		}
	}

	*state = SenderState::Disconnecting;
	disconnect(socket, state)
}

fn disconnect(socket: &Socket, state: &mut SenderState) -> Result<()> {
	codec::disconnect().send(socket)?;

	// A SUCCESS reply here is optional: the peer may already have closed.
	let _ = Packet::recv(socket, false);

	*state = SenderState::Done;
	Ok(())
}
