use std::net::Ipv4Addr;

use gl_util::{Code, Error, Result};

use crate::sys;

/// One local network interface, carrying the pieces discovery needs to run
/// a broadcast round: its address and the broadcast address to send to.
#[derive(Debug, Clone)]
pub struct Interface {
	pub name: String,
	pub address: Ipv4Addr,
	pub broadcast: Ipv4Addr,
}

/// Enumerates local IPv4 interfaces that carry a broadcast address.
///
/// On platforms without enumeration support this collapses to a single
/// synthetic interface bound to `INADDR_ANY`/`INADDR_BROADCAST`, per the
/// single-interface compilation mode the design allows.
pub fn enumerate() -> Result<Vec<Interface>> {
	let raw = sys::enumerate_interfaces().map_err(|err| Error::sock(Code::IFACE_ERR_GETIFADDR, err.to_string()))?;

	Ok(raw
		.into_iter()
		.map(|i| Interface { name: i.name, address: i.address, broadcast: i.broadcast })
		.collect())
}
