//! UDP broadcast peer discovery: the "glproto" envelope, a query-side client
//! that runs one broadcast round per interface, and a responder server.

pub mod client;
pub mod message;
pub mod server;

pub use client::{query, DiscoveryEvent};
pub use message::{DeviceType, Message, MessageType, Peer, PeerId};
pub use server::serve;

/// Default port for both the TCP transfer service and UDP discovery.
pub const GL_SERVER_MAIN_PORT: u16 = 1650;
/// Legacy alternate discovery port, kept for hosts still configured against it.
pub const UDPSERVER_PORT: u16 = 1651;

/// How long a query round waits for replies on one interface before moving on.
pub const QUERY_TIMEOUT_MS: u64 = 1000;
/// Read timeout the responder server applies to its receive loop, letting it
/// periodically check a shutdown flag between datagrams.
pub const SERVER_TIMEOUT_MS: u64 = 5000;
/// Default bound on how many peer ids a [`query`] round remembers for
/// dedup, for callers that don't need to tune it.
pub const DEFAULT_DEDUP_CAPACITY: usize = 256;
