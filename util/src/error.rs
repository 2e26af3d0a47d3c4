use std::fmt;

/// Which layer of the stack raised the error.
///
/// The wire-level design only distinguishes the socket layer (`Sock`) from
/// everything built on top of it (`Gl`): codec, discovery, transport and the
/// facade all report as `Gl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
	Sock,
	Gl,
}

impl fmt::Display for Layer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Layer::Sock => "SOCK",
			Layer::Gl => "GL",
		})
	}
}

/// A mnemonic error code, matching the taxonomy in the wire-level design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Code {
	ESOCKET,
	ESETSOCKOPT,
	EBIND,
	ELISTEN,
	ECLOSE,
	ESEND,
	ERECV,
	ECONNECT,
	ESHUTDOWN,
	EIOCTL,
	IFACE_ERR_GETIFADDR,
	TIMEOUT,
	CONN_SHUTDOWN,
	CONN_CLOSED,

	GL_ERR_INVALID_PACKET,
	GL_ERR_INVALID_STATE_OPCODE,
	GL_ERR_UNAUTHORIZED,
	GL_ERR_DECLINED,
	GL_ERR_PROTOCOL,
	GL_ERR_FS_OPEN,
	GL_ERR_FS_READ,
	GL_ERR_FS_WRITE,
	GL_ERR_FS_SIZE,
	GL_ERR_FS_CLOSE,
	GL_ERR_THREAD_CREATE,
	GL_ERR_THREAD_JOIN,
	GL_ERR_CONFIG,
}

impl fmt::Display for Code {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// A single frame of the error chain.
///
/// Frames are built bottom-up (the deepest cause is constructed first and
/// wrapped by each layer above it) and consumed top-down by walking `cause`;
/// printers that want deepest-first order should collect the chain and
/// reverse it, see [`Error::frames`].
#[derive(Debug, thiserror::Error)]
#[error("[{layer}/{code}] {message}")]
pub struct Error {
	pub layer: Layer,
	pub code: Code,
	pub message: String,
	#[source]
	pub cause: Option<Box<Error>>,
}

impl Error {
	pub fn new(layer: Layer, code: Code, message: impl Into<String>) -> Self {
		Self { layer, code, message: message.into(), cause: None }
	}

	pub fn sock(code: Code, message: impl Into<String>) -> Self {
		Self::new(Layer::Sock, code, message)
	}

	pub fn gl(code: Code, message: impl Into<String>) -> Self {
		Self::new(Layer::Gl, code, message)
	}

	/// Wraps `self` as the cause of a new frame raised by a higher layer.
	pub fn wrap(self, layer: Layer, code: Code, message: impl Into<String>) -> Self {
		Self { layer, code, message: message.into(), cause: Some(Box::new(self)) }
	}

	/// Returns the chain from this frame down to its root cause, in that order.
	pub fn frames(&self) -> Vec<&Error> {
		let mut out = Vec::new();
		let mut cur = Some(self);

		while let Some(e) = cur {
			out.push(e);
			cur = e.cause.as_deref();
		}

		out
	}

	/// Logs the chain deepest-first via the `log` facade, the way a
	/// top-level host drains an error before giving up on an operation.
	pub fn log_chain(&self) {
		for frame in self.frames().into_iter().rev() {
			log::error!("[{}/{}] {}", frame.layer, frame.code, frame.message);
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::sock(Code::ESOCKET, err.to_string())
	}
}

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
