//! Connection-oriented sender and receiver state machines driving
//! CONNECT → PUT* → DISCONNECT exchanges over the OBEX codec and socket layer.

pub mod event;
pub mod receiver;
pub mod sender;
pub mod session;

pub use event::{AlwaysAccept, ConnDecider, EventSink, NullSink};
pub use session::{FileBundle, NegotiatedChunking, ReceiverState, SenderState};
