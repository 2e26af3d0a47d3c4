use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gl_transport::{AlwaysAccept, EventSink, NullSink};
use groundlift::{Client, Config};

struct CountingSink {
	succeeded: AtomicU64,
}

impl EventSink for CountingSink {
	fn put_succeeded(&self, _basename: &str) {
		self.succeeded.fetch_add(1, Ordering::SeqCst);
	}
}

#[test]
fn listen_and_send_file_round_trip() {
	let dir = std::env::temp_dir().join(format!("gl-facade-test-{}", std::process::id()));
	let downloads = dir.join("downloads");
	fs::create_dir_all(&downloads).unwrap();

	let src = dir.join("a.bin");
	let contents: Vec<u8> = (0u8..10).collect();
	fs::write(&src, &contents).unwrap();

	let server_config = Config::new(*b"server01", *b"Lnx", "server-host", downloads.clone());
	let server = Client::new(server_config);

	let sink = Arc::new(CountingSink { succeeded: AtomicU64::new(0) });
	let listen = server.listen(0, Arc::new(AlwaysAccept), sink.clone()).unwrap();
	let port = listen.port();

	let client_config = Config::new(*b"client01", *b"Lnx", "client-host", dir.join("unused"));
	let client = Client::new(client_config);

	let target = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port);
	let handle = client.send_file(target, src, Arc::new(NullSink));
	handle.join().unwrap();

	// Give the accept loop's worker thread a moment to finish writing.
	for _ in 0..50 {
		if sink.succeeded.load(Ordering::SeqCst) == 1 {
			break;
		}
		thread::sleep(Duration::from_millis(20));
	}

	assert_eq!(sink.succeeded.load(Ordering::SeqCst), 1);

	let received = fs::read(downloads.join("a.bin")).unwrap();
	assert_eq!(received, contents);

	listen.stop();
	let _ = fs::remove_dir_all(&dir);
}
