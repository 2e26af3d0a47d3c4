use std::net::SocketAddrV4;

/// Host-facing callback surface. A front-end implements the events it cares
/// about; the rest fall back to the empty default, so adding a new event
/// here never forces every implementor to change.
///
/// Wired as `&dyn EventSink` rather than a `void*` + function pointer pair —
/// the state machines borrow it for the lifetime of one session and never
/// need to outlive that borrow.
pub trait EventSink {
	fn connected(&self, _endpoint: SocketAddrV4) {}
	fn conn_req_resp(&self, _basename: &str, _accepted: bool) {}
	fn put_progress(&self, _basename: &str, _sent_bytes: u64, _total_bytes: u64, _chunk_index: u32, _chunk_size: u32) {}
	fn put_succeeded(&self, _basename: &str) {}
	fn disconnected(&self, _endpoint: SocketAddrV4) {}
}

/// An [`EventSink`] that discards every event, for tests and callers that
/// don't need progress reporting.
pub struct NullSink;

impl EventSink for NullSink {}

/// The receiver's synchronous accept/decline decision for an incoming
/// CONNECT, made with the offered file's name, size, and sender hostname.
pub trait ConnDecider {
	fn decide(&self, basename: &str, size: u64, hostname: &str) -> bool;
}

impl<F: Fn(&str, u64, &str) -> bool> ConnDecider for F {
	fn decide(&self, basename: &str, size: u64, hostname: &str) -> bool {
		self(basename, size, hostname)
	}
}

/// Always accepts, for receivers that never decline.
pub struct AlwaysAccept;

impl ConnDecider for AlwaysAccept {
	fn decide(&self, _basename: &str, _size: u64, _hostname: &str) -> bool {
		true
	}
}
