use std::path::PathBuf;

/// Process-wide, read-only-after-construction configuration snapshot.
///
/// Carries exactly the fields the wire-level design names: a stable 8-byte
/// peer id, a 3-character device-type tag, a hostname, and the directory
/// incoming files land in. Consumed by [`gl_glproto`] (peer id, device type,
/// hostname go on the wire) and by the receiver state machine (download
/// directory).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
	pub peer_id: [u8; 8],
	pub device_type: [u8; 3],
	pub hostname: String,
	pub download_dir: PathBuf,
}

impl Config {
	pub fn new(peer_id: [u8; 8], device_type: [u8; 3], hostname: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
		Self { peer_id, device_type, hostname: hostname.into(), download_dir: download_dir.into() }
	}

	/// Maps `std::env::consts::OS` to the 3-character device-type tag the
	/// wire format carries. This is the one sliver of the out-of-scope "OS
	/// version probe" the configuration snapshot's own field can't do
	/// without; it is not a general OS-probing subsystem, and a host is
	/// free to override the result it picks.
	pub fn probe_device_type() -> [u8; 3] {
		match std::env::consts::OS {
			"linux" => *b"Lnx",
			"windows" => *b"Win",
			"macos" => *b"Mac",
			_ => *b"Ukn",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn probe_device_type_never_panics_on_unknown_os() {
		let tag = Config::probe_device_type();
		assert_eq!(tag.len(), 3);
	}

	#[test]
	fn new_carries_fields_verbatim() {
		let cfg = Config::new(*b"12345678", *b"Lnx", "host-a", "/tmp/downloads");

		assert_eq!(cfg.peer_id, *b"12345678");
		assert_eq!(cfg.device_type, *b"Lnx");
		assert_eq!(cfg.hostname, "host-a");
		assert_eq!(cfg.download_dir, PathBuf::from("/tmp/downloads"));
	}
}
