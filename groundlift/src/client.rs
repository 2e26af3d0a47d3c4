use std::net::{Ipv4Addr, SocketAddrV4, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use gl_glproto::DiscoveryEvent;
use gl_socket::Socket;
use gl_transport::{receiver, sender, ConnDecider, EventSink};
use gl_util::{Code, Error, Result};

use crate::config::Config;
use crate::paths;

/// A session's live socket plus its `running` flag, shared between the
/// worker thread driving the session and whatever thread calls
/// [`SessionHandle::shutdown`].
///
/// Matches the wire-level design's concurrency model: the handle is owned
/// exclusively by its worker thread from creation until join, with a
/// `client` mutex guarding the connection handle itself. A second `send`
/// mutex guards event emission so a `shutdown` racing a worker's last
/// event can't let that event escape after the session is considered gone.
struct SessionHandle {
	client: Mutex<ClientState>,
	send: Mutex<()>,
}

struct ClientState {
	socket: Option<Socket>,
	running: bool,
}

impl SessionHandle {
	fn new() -> Arc<Self> {
		Arc::new(Self { client: Mutex::new(ClientState { socket: None, running: false }), send: Mutex::new(()) })
	}

	/// Registers a clone of the socket this session drives, so `shutdown`
	/// can be called from another thread without waiting on (or racing)
	/// whatever blocking call the worker thread is making on its own copy.
	fn attach(&self, socket: &Socket) -> Result<()> {
		let clone = socket.try_clone()?;
		let mut state = self.client.lock().unwrap();
		state.socket = Some(clone);
		state.running = true;

		Ok(())
	}

	fn is_running(&self) -> bool {
		self.client.lock().unwrap().running
	}

	/// Unblocks the worker thread's current or next blocking call by
	/// shutting down its socket, then marks the session no longer running.
	/// Idempotent; safe to call from any thread, any number of times.
	fn shutdown(&self) {
		let mut state = self.client.lock().unwrap();

		if !state.running {
			return;
		}

		state.running = false;

		if let Some(socket) = &state.socket {
			let _ = socket.shutdown();
		}
	}

	/// Runs `emit` only if the session is still running, serialized
	/// against concurrent `shutdown` calls via the `send` mutex.
	fn emit(&self, emit: impl FnOnce()) {
		let _guard = self.send.lock().unwrap();

		if self.is_running() {
			emit();
		}
	}
}

/// Wraps a host-supplied [`EventSink`] so every callback is gated by a
/// [`SessionHandle`]: once the session has been shut down, no further
/// event reaches the host.
struct GuardedSink<'a> {
	inner: &'a (dyn EventSink + Sync),
	handle: &'a SessionHandle,
}

impl EventSink for GuardedSink<'_> {
	fn connected(&self, endpoint: SocketAddrV4) {
		self.handle.emit(|| self.inner.connected(endpoint));
	}

	fn conn_req_resp(&self, basename: &str, accepted: bool) {
		self.handle.emit(|| self.inner.conn_req_resp(basename, accepted));
	}

	fn put_progress(&self, basename: &str, sent_bytes: u64, total_bytes: u64, chunk_index: u32, chunk_size: u32) {
		self.handle.emit(|| self.inner.put_progress(basename, sent_bytes, total_bytes, chunk_index, chunk_size));
	}

	fn put_succeeded(&self, basename: &str) {
		self.handle.emit(|| self.inner.put_succeeded(basename));
	}

	fn disconnected(&self, endpoint: SocketAddrV4) {
		self.handle.emit(|| self.inner.disconnected(endpoint));
	}
}

/// Handle to a running `Client::send_file` background thread. Matches
/// §5's "the outbound sender owns one background thread so the front-end
/// can remain responsive".
pub struct SendHandle {
	session: Arc<SessionHandle>,
	thread: JoinHandle<Result<()>>,
}

impl SendHandle {
	/// Cancels the in-flight send: unblocks whatever blocking call the
	/// worker thread is in and lets its terminal transition run.
	pub fn cancel(&self) {
		self.session.shutdown();
	}

	/// Blocks until the send thread finishes and returns its result.
	pub fn join(self) -> Result<()> {
		self.thread.join().unwrap_or_else(|_| Err(Error::gl(Code::GL_ERR_THREAD_JOIN, "send worker thread panicked")))
	}
}

/// Handle to a running `Client::listen` accept loop. Dropping this handle
/// does not stop the loop — call [`ListenHandle::stop`] explicitly.
pub struct ListenHandle {
	port: u16,
	running: Arc<AtomicBool>,
	accept_thread: Option<JoinHandle<()>>,
	sessions: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl ListenHandle {
	/// The port the accept loop actually bound to (useful when `listen`
	/// was called with port `0` for an ephemeral port).
	pub fn port(&self) -> u16 {
		self.port
	}

	/// Stops the accept loop and joins every worker thread it spawned.
	///
	/// Cancellation here is bespoke, per §5: there is no portable way to
	/// interrupt a blocking `accept()`, so this connects to the listener's
	/// own address to wake it up, exactly as a real peer would, and relies
	/// on the accept loop observing the cleared `running` flag before it
	/// spawns a worker for that connection.
	pub fn stop(mut self) {
		self.running.store(false, Ordering::SeqCst);

		if let Ok(stream) = TcpStream::connect((Ipv4Addr::LOCALHOST, self.port)) {
			drop(stream);
		}

		if let Some(accept_thread) = self.accept_thread.take() {
			let _ = accept_thread.join();
		}

		for worker in self.sessions.lock().unwrap().drain(..) {
			let _ = worker.join();
		}
	}
}

/// Facade wiring the socket, codec, discovery, and transport layers into
/// the operations a front-end drives: listen for inbound transfers, send a
/// file to a peer, and run one discovery round.
pub struct Client {
	config: Config,
}

impl Client {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Spawns the inbound accept loop on `port`. Each accepted connection
	/// gets its own worker thread running the receiver state machine
	/// (`Listening → Accepted → ... → Done`), per §5's "each accepted
	/// inbound connection owns one thread for the lifetime of its session".
	pub fn listen<D, S>(&self, port: u16, decider: Arc<D>, sink: Arc<S>) -> Result<ListenHandle>
	where
		D: ConnDecider + Send + Sync + 'static,
		S: EventSink + Sync + Send + 'static,
	{
		let mut listener = Socket::new();
		listener.set_address(None, port);
		listener.setup_tcp(true)?;

		let bound_port = listener.address().port();
		let running = Arc::new(AtomicBool::new(true));
		let sessions: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::new(Mutex::new(Vec::new()));

		let download_dir = self.config.download_dir.clone();
		let accept_running = running.clone();
		let accept_sessions = sessions.clone();

		let accept_thread = thread::spawn(move || {
			while accept_running.load(Ordering::SeqCst) {
				let conn = match listener.accept() {
					Ok(conn) => conn,
					Err(err) => {
						log::warn!("accept() failed: {err}");
						continue;
					}
				};

				if !accept_running.load(Ordering::SeqCst) {
					// The self-connect `ListenHandle::stop` uses to wake
					// `accept()` up lands here; don't spin up a worker for it.
					break;
				}

				let decider = decider.clone();
				let sink = sink.clone();
				let download_dir = download_dir.clone();

				let worker = thread::spawn(move || {
					let resolve = move |basename: &str| paths::unique_path(&download_dir, basename);

					if let Err(err) = receiver::run(&conn, resolve, decider.as_ref(), sink.as_ref()) {
						err.log_chain();
					}
				});

				accept_sessions.lock().unwrap().push(worker);
			}
		});

		Ok(ListenHandle { port: bound_port, running, accept_thread: Some(accept_thread), sessions })
	}

	/// Spawns a background thread sending `path` to `target`, per §5's
	/// "the outbound sender owns one background thread so the front-end
	/// can remain responsive". Returns a handle the caller can cancel or
	/// join.
	pub fn send_file<S>(&self, target: SocketAddrV4, path: PathBuf, sink: Arc<S>) -> SendHandle
	where
		S: EventSink + Sync + Send + 'static,
	{
		let hostname = self.config.hostname.clone();
		let session = SessionHandle::new();
		let worker_session = session.clone();

		let thread = thread::spawn(move || -> Result<()> {
			let socket = sender::connect(target)?;
			worker_session.attach(&socket)?;

			let guarded = GuardedSink { inner: sink.as_ref(), handle: &worker_session };
			guarded.connected(target);

			let result = sender::run_on(&socket, &path, &hostname, &guarded);
			let _ = socket.shutdown();

			guarded.disconnected(target);
			worker_session.shutdown();

			result
		});

		SendHandle { session, thread }
	}

	/// Runs one discovery broadcast round (one per local interface),
	/// blocking until every interface has timed out.
	pub fn discover(&self, on_event: impl FnMut(DiscoveryEvent)) -> Result<()> {
		gl_glproto::query(self.config.peer_id, self.config.device_type, self.config.hostname.clone(), on_event)
	}

	/// Spawns the discovery responder server on a background thread, per
	/// §5's "the discovery receive loop owns one thread with a bounded
	/// timeout". `running` lets the caller stop it between receives.
	pub fn serve_discovery(&self, running: Arc<AtomicBool>) -> JoinHandle<Result<()>> {
		let peer_id = self.config.peer_id;
		let device_type = self.config.device_type;
		let hostname = self.config.hostname.clone();

		thread::spawn(move || gl_glproto::serve(peer_id, device_type, hostname, running))
	}
}
