use std::io;
use std::mem;
use std::net::{Ipv4Addr, SocketAddrV4, TcpListener, UdpSocket};
use std::os::windows::io::{FromRawSocket, RawSocket};
use std::sync::Once;

use windows_sys::Win32::Networking::WinSock::{
	bind, closesocket, listen, setsockopt, socket, WSAGetLastError, WSAStartup, AF_INET, INVALID_SOCKET, SOCKADDR, SOCKADDR_IN, SOCKET,
	SOCK_DGRAM, SOCK_STREAM, SOL_SOCKET, SO_REUSEADDR, WSADATA,
};

use super::RawInterface;

static WSA_INIT: Once = Once::new();

fn ensure_wsa() {
	WSA_INIT.call_once(|| unsafe {
		let mut data: WSADATA = mem::zeroed();
		WSAStartup(0x0202, &mut data);
	});
}

fn last_err() -> io::Error {
	io::Error::from_raw_os_error(unsafe { WSAGetLastError() })
}

fn to_sockaddr(addr: SocketAddrV4) -> SOCKADDR_IN {
	let mut sa: SOCKADDR_IN = unsafe { mem::zeroed() };

	sa.sin_family = AF_INET as _;
	sa.sin_port = addr.port().to_be();
	sa.sin_addr.S_un.S_addr = u32::from_ne_bytes(addr.ip().octets());

	sa
}

fn new_raw(ty: i32) -> io::Result<SOCKET> {
	ensure_wsa();

	let sock = unsafe { socket(AF_INET as _, ty, 0) };

	if sock == INVALID_SOCKET {
		return Err(last_err());
	}

	let on: i32 = 1;

	unsafe {
		setsockopt(sock, SOL_SOCKET as _, SO_REUSEADDR as _, &on as *const _ as *const u8, mem::size_of::<i32>() as _);
	}

	Ok(sock)
}

fn bind_raw(sock: SOCKET, addr: SocketAddrV4) -> io::Result<()> {
	let sa = to_sockaddr(addr);

	let ret = unsafe { bind(sock, &sa as *const _ as *const SOCKADDR, mem::size_of::<SOCKADDR_IN>() as _) };

	if ret != 0 {
		unsafe { closesocket(sock) };
		return Err(last_err());
	}

	Ok(())
}

pub fn new_tcp_listener(addr: SocketAddrV4, backlog: i32) -> io::Result<TcpListener> {
	let sock = new_raw(SOCK_STREAM)?;

	bind_raw(sock, addr)?;

	if unsafe { listen(sock, backlog) } != 0 {
		unsafe { closesocket(sock) };
		return Err(last_err());
	}

	Ok(unsafe { TcpListener::from_raw_socket(sock as RawSocket) })
}

pub fn new_udp_socket(addr: SocketAddrV4) -> io::Result<UdpSocket> {
	let sock = new_raw(SOCK_DGRAM)?;

	bind_raw(sock, addr)?;

	Ok(unsafe { UdpSocket::from_raw_socket(sock as RawSocket) })
}

/// Windows has no portable, dependency-free interface enumeration here;
/// this falls back to the single-interface mode the design allows for
/// platforms lacking it, collapsing to `INADDR_ANY`/`INADDR_BROADCAST`.
pub fn enumerate_interfaces() -> io::Result<Vec<RawInterface>> {
	Ok(vec![RawInterface {
		name: "any".to_owned(),
		address: Ipv4Addr::UNSPECIFIED,
		broadcast: Ipv4Addr::BROADCAST,
	}])
}
