use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;

use gl_socket::Socket;
use gl_transport::event::EventSink;
use gl_transport::{receiver, sender, AlwaysAccept, NullSink};

struct Counting {
	succeeded: AtomicU64,
	declined: Mutex<Vec<String>>,
}

impl Counting {
	fn new() -> Self {
		Self { succeeded: AtomicU64::new(0), declined: Mutex::new(Vec::new()) }
	}
}

impl EventSink for Counting {
	fn put_succeeded(&self, _basename: &str) {
		self.succeeded.fetch_add(1, Ordering::SeqCst);
	}

	fn conn_req_resp(&self, basename: &str, accepted: bool) {
		if !accepted {
			self.declined.lock().unwrap().push(basename.to_owned());
		}
	}
}

fn start_server(port: u16) -> Socket {
	let mut server = Socket::new();
	server.set_address(None, port);
	server.setup_tcp(true).unwrap();
	server
}

#[test]
fn full_send_writes_a_byte_identical_file() {
	let dir = std::env::temp_dir().join(format!("gl-transport-test-{}", std::process::id()));
	fs::create_dir_all(&dir).unwrap();

	let src = dir.join("a.bin");
	let contents: Vec<u8> = (0u8..10).collect();
	fs::write(&src, &contents).unwrap();

	let out = dir.join("a.bin.out");
	let out_for_closure = out.clone();

	let server = start_server(0);
	let port = server.address().port();

	let handle = thread::spawn(move || {
		let conn = server.accept().unwrap();
		let sink = Counting::new();

		receiver::run(&conn, move |_name| Ok(out_for_closure.clone()), &AlwaysAccept, &sink).unwrap();

		sink.succeeded.load(Ordering::SeqCst)
	});

	let target = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port);
	sender::run(target, &src, "test-host", &NullSink).unwrap();

	let succeeded = handle.join().unwrap();
	assert_eq!(succeeded, 1);

	let received = fs::read(&out).unwrap();
	assert_eq!(received, contents);

	let _ = fs::remove_dir_all(&dir);
}

#[test]
fn multi_chunk_send_splits_on_the_negotiated_chunk_size() {
	let dir = std::env::temp_dir().join(format!("gl-transport-test-multichunk-{}", std::process::id()));
	fs::create_dir_all(&dir).unwrap();

	// 24000 bytes over the 8000-byte default chunk cap: exactly 3 PUTs,
	// the last one exactly full rather than a short final chunk.
	let src = dir.join("big.bin");
	let contents: Vec<u8> = (0..24000u32).map(|i| (i % 256) as u8).collect();
	fs::write(&src, &contents).unwrap();

	let out = dir.join("big.bin.out");
	let out_for_closure = out.clone();

	let server = start_server(0);
	let port = server.address().port();

	let handle = thread::spawn(move || {
		let conn = server.accept().unwrap();
		let sink = Counting::new();
		let chunks = Mutex::new(0u32);

		struct ChunkCounting<'a> {
			inner: &'a Counting,
			chunks: &'a Mutex<u32>,
		}

		impl EventSink for ChunkCounting<'_> {
			fn put_succeeded(&self, basename: &str) {
				self.inner.put_succeeded(basename);
			}

			fn put_progress(&self, _basename: &str, _sent_bytes: u64, _total_bytes: u64, chunk_index: u32, _chunk_size: u32) {
				*self.chunks.lock().unwrap() = chunk_index;
			}
		}

		let counting_sink = ChunkCounting { inner: &sink, chunks: &chunks };

		receiver::run(&conn, move |_name| Ok(out_for_closure.clone()), &AlwaysAccept, &counting_sink).unwrap();

		(sink.succeeded.load(Ordering::SeqCst), *chunks.lock().unwrap())
	});

	let target = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port);
	sender::run(target, &src, "test-host", &NullSink).unwrap();

	let (succeeded, last_chunk_index) = handle.join().unwrap();
	assert_eq!(succeeded, 1);
	assert_eq!(last_chunk_index, 3);

	let received = fs::read(&out).unwrap();
	assert_eq!(received, contents);

	let _ = fs::remove_dir_all(&dir);
}

#[test]
fn declined_transfer_writes_nothing() {
	let dir = std::env::temp_dir().join(format!("gl-transport-test-decline-{}", std::process::id()));
	fs::create_dir_all(&dir).unwrap();

	let src = dir.join("b.bin");
	fs::write(&src, [1, 2, 3]).unwrap();

	let out = dir.join("b.bin.out");
	let out_for_closure = out.clone();

	let server = start_server(0);
	let port = server.address().port();

	let handle = thread::spawn(move || {
		let conn = server.accept().unwrap();
		let sink = Counting::new();

		let decider = |_: &str, _: u64, _: &str| false;
		receiver::run(&conn, move |_name| Ok(out_for_closure.clone()), &decider, &sink).unwrap();

		sink.declined.lock().unwrap().clone()
	});

	let target = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port);
	sender::run(target, &src, "test-host", &NullSink).unwrap();

	let declined = handle.join().unwrap();
	assert_eq!(declined, vec!["b.bin".to_owned()]);
	assert!(!out.exists());

	let _ = fs::remove_dir_all(&dir);
}
