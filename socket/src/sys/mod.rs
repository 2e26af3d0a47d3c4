//! Platform-specific socket construction.
//!
//! Everything `std::net` already covers (connect, send/recv, peek,
//! read-timeout, broadcast, multicast-loop) is used directly from
//! [`crate::handle`]. This module only carries the handful of operations
//! std has no portable API for: `SO_REUSEPORT` (which must be set before
//! `bind`, so the socket has to be constructed by hand) and network
//! interface enumeration.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::*;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::*;

/// One network interface, as reported by the host OS.
#[derive(Debug, Clone)]
pub struct RawInterface {
	pub name: String,
	pub address: std::net::Ipv4Addr,
	pub broadcast: std::net::Ipv4Addr,
}
