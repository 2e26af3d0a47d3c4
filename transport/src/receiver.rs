use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use gl_codec::{self as codec, Opcode, Packet};
use gl_socket::Socket;
use gl_util::{Code, Error, Result};

use crate::event::{ConnDecider, EventSink};
use crate::session::ReceiverState;

/// Drives one accepted connection through
/// `Accepted → AwaitingConnect → DecidingAccept → Streaming → Draining → Done`.
///
/// `resolve_output_path` allocates (and uniquifies, per the download-directory
/// collaborator's rule) the on-disk path for a given basename; this crate has
/// no opinion on download-directory layout, so that decision is injected.
pub fn run(socket: &Socket, resolve_output_path: impl Fn(&str) -> std::io::Result<PathBuf>, decider: &dyn ConnDecider, sink: &dyn EventSink) -> Result<()> {
	let mut state = ReceiverState::Accepted;
	let endpoint = socket.peer_address().ok_or_else(|| Error::gl(Code::GL_ERR_INVALID_STATE_OPCODE, "accepted socket has no peer address"))?;

	let result = drive(socket, &resolve_output_path, decider, sink, &mut state);

	if let Err(err) = &result {
		log::warn!("receiver session with {endpoint} aborted in state {state:?}: {err}");
	}

	let _ = socket.shutdown();
	sink.disconnected(endpoint);

	result
}

fn drive(socket: &Socket, resolve_output_path: &impl Fn(&str) -> std::io::Result<PathBuf>, decider: &dyn ConnDecider, sink: &dyn EventSink, state: &mut ReceiverState) -> Result<()> {
	let request = Packet::recv(socket, true)?;

	if request.is_invalid() || request.opcode != Opcode::CONNECT {
		*state = ReceiverState::Error;
		codec::unauthorized(None).send(socket)?;
		return Err(Error::gl(Code::GL_ERR_INVALID_STATE_OPCODE, "expected CONNECT as the first packet"));
	}

	*state = ReceiverState::AwaitingConnect;

	let basename = request.name().unwrap_or_default().to_owned();
	let size = request.length().unwrap_or(0) as u64;
	let hostname = request.hostname().unwrap_or_default().to_owned();
	let peer_max_packet_size = request.params.map_or(codec::OBEX_MAX_PACKET_SIZE, |p| p.max_packet_size);

	*state = ReceiverState::DecidingAccept;

	if !decider.decide(&basename, size, &hostname) {
		codec::unauthorized(Some(gl_codec::ConnectParams::new(peer_max_packet_size))).send(socket)?;
		sink.conn_req_resp(&basename, false);

		*state = ReceiverState::Done;
		return Ok(());
	}

	let output_path = resolve_output_path(&basename).map_err(|err| Error::gl(Code::GL_ERR_FS_OPEN, err.to_string()))?;

	let mut file = File::create(&output_path).map_err(|err| Error::gl(Code::GL_ERR_FS_OPEN, err.to_string()))?;

	codec::success(Some(gl_codec::ConnectParams::new(peer_max_packet_size))).send(socket)?;
	sink.conn_req_resp(&basename, true);

	*state = ReceiverState::Streaming;

	let mut received: u64 = 0;
	let mut chunk_index: u32 = 0;

	loop {
		let packet = Packet::recv(socket, false)?;

		if packet.is_invalid() || (packet.opcode != Opcode::PUT && packet.opcode != Opcode::PUT_FINAL) {
			*state = ReceiverState::Error;
			return Err(Error::gl(Code::GL_ERR_INVALID_STATE_OPCODE, "expected PUT while streaming"));
		}

		let body = packet.body.clone().unwrap_or_default();
		file.write_all(&body).map_err(|err| Error::gl(Code::GL_ERR_FS_WRITE, err.to_string()))?;

		received += body.len() as u64;
		chunk_index += 1;
		sink.put_progress(&basename, received, size, chunk_index, body.len() as u32);

		if packet.opcode == Opcode::PUT_FINAL {
			file.sync_all().map_err(|err| Error::gl(Code::GL_ERR_FS_WRITE, err.to_string()))?;
			drop(file);

			sink.put_succeeded(&basename);
			codec::success(None).send(socket)?;

			break;
		}

		codec::continue_().send(socket)?;
	}

	*state = ReceiverState::Draining;

	// A peer-initiated shutdown observed here in place of an explicit
	// DISCONNECT is tolerated as a clean close (the design's `CONN_SHUTDOWN`
	// allowance for `Draining`).
	let disconnect = match Packet::recv(socket, false) {
		Ok(packet) => packet,
		Err(err) if matches!(err.code, Code::CONN_SHUTDOWN | Code::CONN_CLOSED) => {
			*state = ReceiverState::Done;
			return Ok(());
		}
		Err(err) => return Err(err),
	};

	if disconnect.is_invalid() || disconnect.opcode != Opcode::DISCONNECT {
		*state = ReceiverState::Error;
		return Err(Error::gl(Code::GL_ERR_INVALID_STATE_OPCODE, "expected DISCONNECT after streaming"));
	}

	codec::success(None).send(socket)?;
	*state = ReceiverState::Done;

	Ok(())
}
