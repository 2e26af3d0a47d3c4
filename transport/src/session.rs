use std::path::PathBuf;

use gl_codec::OBEX_MAX_FILE_CHUNK;

/// A file's identity within a transfer: its full path, basename, and size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileBundle {
	pub path: PathBuf,
	pub basename: String,
	pub size: u64,
}

impl FileBundle {
	pub fn from_path(path: impl Into<PathBuf>, size: u64) -> Self {
		let path = path.into();
		let basename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

		Self { path, basename, size }
	}
}

/// Receiver-side states, per the CONNECT → accept/decline → stream →
/// disconnect exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiverState {
	Listening,
	Accepted,
	AwaitingConnect,
	DecidingAccept,
	Streaming,
	Draining,
	Done,
	Error,
}

/// Sender-side states, per the connect → negotiate → stream → disconnect
/// exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SenderState {
	Idle,
	Connecting,
	Negotiating,
	Streaming,
	Disconnecting,
	Done,
	Error,
}

/// Negotiated parameters once CONNECT has been exchanged: the peer's
/// maximum packet size and the chunk size this session settles on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NegotiatedChunking {
	pub peer_max_packet_size: u16,
	pub chunk_size: usize,
}

impl NegotiatedChunking {
	pub fn new(peer_max_packet_size: u16) -> Self {
		let chunk_size = (peer_max_packet_size as usize).min(OBEX_MAX_FILE_CHUNK);

		Self { peer_max_packet_size, chunk_size }
	}
}
