//! The OBEX-derived packet codec: opcodes, typed headers, binary framing,
//! and constructors for the packets CONNECT/PUT/DISCONNECT exchanges use.

pub mod header;
pub mod opcode;
pub mod packet;

pub use header::Header;
pub use opcode::Opcode;
pub use packet::{connect, continue_, disconnect, get, put, success, unauthorized, ConnectParams, Packet, OBEX_MAX_FILE_CHUNK, OBEX_MAX_PACKET_SIZE, OBEX_PROTO_VERSION};
