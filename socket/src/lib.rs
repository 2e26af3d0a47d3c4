//! Cross-platform socket layer.
//!
//! A thin handle over datagram and stream sockets: create/bind/connect/
//! accept/send/recv, broadcast and reuse-address options, receive
//! timeouts, and network-interface enumeration with broadcast addresses.
//! Everything `std::net` already covers is used directly; [`sys`] only
//! carries the handful of platform-specific pieces std has no portable API
//! for.

mod handle;
mod iface;
mod sys;

pub use handle::{Socket, TCPSERVER_BACKLOG};
pub use iface::{enumerate as enumerate_interfaces, Interface};
