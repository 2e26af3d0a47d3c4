use std::net::{Ipv4Addr, Shutdown, SocketAddrV4, TcpListener, TcpStream, UdpSocket};
use std::time::Duration;

use gl_util::{Code, Error, Result};

use crate::sys;

/// Default backlog for `setup_tcp(server: true)`.
pub const TCPSERVER_BACKLOG: i32 = 10;

enum Inner {
	Empty,
	TcpListener(TcpListener),
	TcpStream(TcpStream),
	Udp(UdpSocket),
}

/// A thin, cross-platform handle over one datagram or stream socket.
///
/// Mirrors the lifecycle the wire-level design calls for: a freshly
/// allocated handle carries no underlying OS socket until `setup_tcp` or
/// `setup_udp` creates one.
pub struct Socket {
	addr: SocketAddrV4,
	peer: Option<SocketAddrV4>,
	inner: Inner,
}

impl Socket {
	pub fn new() -> Self {
		Self { addr: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0), peer: None, inner: Inner::Empty }
	}

	/// Sets the target endpoint. `host = None` means `INADDR_ANY`.
	pub fn set_address(&mut self, host: Option<Ipv4Addr>, port: u16) {
		self.addr = SocketAddrV4::new(host.unwrap_or(Ipv4Addr::UNSPECIFIED), port);
	}

	pub fn set_address_raw(&mut self, addr: Ipv4Addr, port: u16) {
		self.addr = SocketAddrV4::new(addr, port);
	}

	pub fn address(&self) -> SocketAddrV4 {
		self.addr
	}

	pub fn peer_address(&self) -> Option<SocketAddrV4> {
		self.peer
	}

	/// Creates a TCP socket. When `server`, enables `SO_REUSEADDR`/
	/// `SO_REUSEPORT` (where available), binds to the configured address
	/// and starts listening with [`TCPSERVER_BACKLOG`].
	pub fn setup_tcp(&mut self, server: bool) -> Result<()> {
		if server {
			let listener = sys::new_tcp_listener(self.addr, TCPSERVER_BACKLOG).map_err(|err| Error::sock(Code::EBIND, err.to_string()))?;

			if let Ok(std::net::SocketAddr::V4(bound)) = listener.local_addr() {
				self.addr = bound;
			}

			self.inner = Inner::TcpListener(listener);
		} else {
			self.inner = Inner::Empty;
		}

		Ok(())
	}

	/// Creates a UDP socket. Enables `SO_REUSEADDR`/`SO_REUSEPORT`,
	/// `SO_BROADCAST`, disables multicast loopback, and if `timeout` is
	/// set, applies it as `SO_RCVTIMEO`. When `server`, binds to the
	/// configured address; otherwise binds an ephemeral local port.
	pub fn setup_udp(&mut self, server: bool, timeout: Option<Duration>) -> Result<()> {
		let socket = if server {
			sys::new_udp_socket(self.addr).map_err(|err| Error::sock(Code::EBIND, err.to_string()))?
		} else {
			UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(|err| Error::sock(Code::ESOCKET, err.to_string()))?
		};

		socket.set_broadcast(true).map_err(|err| Error::sock(Code::ESETSOCKOPT, err.to_string()))?;
		socket.set_multicast_loop_v4(false).map_err(|err| Error::sock(Code::ESETSOCKOPT, err.to_string()))?;
		socket.set_read_timeout(timeout).map_err(|err| Error::sock(Code::ESETSOCKOPT, err.to_string()))?;

		if let Ok(std::net::SocketAddr::V4(bound)) = socket.local_addr() {
			self.addr = bound;
		}

		self.inner = Inner::Udp(socket);

		Ok(())
	}

	/// Blocks on an inbound stream connection.
	pub fn accept(&self) -> Result<Socket> {
		let Inner::TcpListener(listener) = &self.inner else {
			return Err(Error::sock(Code::ESOCKET, "accept() called on a non-listening socket"));
		};

		let (stream, peer) = listener.accept().map_err(|err| Error::sock(Code::ESOCKET, err.to_string()))?;

		let peer = match peer {
			std::net::SocketAddr::V4(v4) => v4,
			std::net::SocketAddr::V6(_) => return Err(Error::sock(Code::ESOCKET, "unexpected IPv6 peer")),
		};

		Ok(Socket { addr: peer, peer: Some(peer), inner: Inner::TcpStream(stream) })
	}

	/// Connects a stream handle to its preconfigured address.
	pub fn connect(&mut self) -> Result<()> {
		let stream = TcpStream::connect(self.addr).map_err(|err| Error::sock(Code::ECONNECT, err.to_string()))?;

		self.peer = Some(self.addr);
		self.inner = Inner::TcpStream(stream);

		Ok(())
	}

	pub fn send(&self, buf: &[u8]) -> Result<usize> {
		use std::io::Write;

		let mut stream = self.stream_handle()?;

		stream.write_all(buf).map_err(|err| Error::sock(Code::ESEND, err.to_string()))?;

		Ok(buf.len())
	}

	/// Reads from the stream socket. `peek` maps to `MSG_PEEK`; when not
	/// peeking, `wait_all` keeps reading until `buf` is filled. A read of
	/// zero bytes (peer closed, non-peek) is reported as `CONN_CLOSED`.
	pub fn recv(&self, buf: &mut [u8], peek: bool, wait_all: bool) -> Result<usize> {
		use std::io::Read;

		let stream = self.stream_handle()?;

		if peek {
			return stream.peek(buf).map_err(|err| Error::sock(Code::ERECV, err.to_string()));
		}

		if wait_all {
			let mut stream = stream;

			stream.read_exact(buf).map_err(|err| {
				if err.kind() == std::io::ErrorKind::UnexpectedEof {
					Error::sock(Code::CONN_CLOSED, "peer closed the connection")
				} else {
					Error::sock(Code::ERECV, err.to_string())
				}
			})?;

			return Ok(buf.len());
		}

		let mut stream = stream;
		let n = stream.read(buf).map_err(|err| Error::sock(Code::ERECV, err.to_string()))?;

		if n == 0 {
			return Err(Error::sock(Code::CONN_CLOSED, "peer closed the connection"));
		}

		Ok(n)
	}

	pub fn sendto(&self, buf: &[u8], addr: SocketAddrV4) -> Result<usize> {
		let Inner::Udp(socket) = &self.inner else {
			return Err(Error::sock(Code::ESEND, "sendto() called on a non-datagram socket"));
		};

		socket.send_to(buf, addr).map_err(|err| Error::sock(Code::ESEND, err.to_string()))
	}

	/// Receives one datagram. On a timed-out `SO_RCVTIMEO`, returns the
	/// `TIMEOUT` event code rather than a hard error.
	pub fn recvfrom(&self, buf: &mut [u8], peek: bool) -> Result<(usize, SocketAddrV4)> {
		let Inner::Udp(socket) = &self.inner else {
			return Err(Error::sock(Code::ERECV, "recvfrom() called on a non-datagram socket"));
		};

		let result = if peek { socket.peek_from(buf) } else { socket.recv_from(buf) };

		let (n, peer) = result.map_err(|err| match err.kind() {
			std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => Error::sock(Code::TIMEOUT, "recvfrom() timed out"),
			_ => Error::sock(Code::ERECV, err.to_string()),
		})?;

		let peer = match peer {
			std::net::SocketAddr::V4(v4) => v4,
			std::net::SocketAddr::V6(_) => return Err(Error::sock(Code::ERECV, "unexpected IPv6 peer")),
		};

		Ok((n, peer))
	}

	/// Half-closes both directions then releases the socket. Idempotent.
	pub fn shutdown(&self) -> Result<()> {
		if let Inner::TcpStream(stream) = &self.inner {
			match stream.shutdown(Shutdown::Both) {
				Ok(()) => {}
				Err(err) if err.kind() == std::io::ErrorKind::NotConnected => {}
				Err(err) => return Err(Error::sock(Code::ESHUTDOWN, err.to_string())),
			}
		}

		Ok(())
	}

	fn stream_handle(&self) -> Result<&TcpStream> {
		match &self.inner {
			Inner::TcpStream(stream) => Ok(stream),
			_ => Err(Error::sock(Code::ERECV, "operation requires a connected stream socket")),
		}
	}

	/// Duplicates the underlying stream socket. The clone shares the same
	/// OS-level connection, so calling `shutdown` on one handle is visible
	/// to the other immediately, including unblocking a concurrent blocking
	/// `recv` — this is what lets a host-facing handle cancel a worker
	/// thread's in-flight call without holding any lock across it.
	pub fn try_clone(&self) -> Result<Socket> {
		let stream = self.stream_handle()?.try_clone().map_err(|err| Error::sock(Code::ESOCKET, err.to_string()))?;

		Ok(Socket { addr: self.addr, peer: self.peer, inner: Inner::TcpStream(stream) })
	}
}

impl Default for Socket {
	fn default() -> Self {
		Self::new()
	}
}
