use std::ffi::CStr;
use std::io;
use std::mem;
use std::net::{Ipv4Addr, SocketAddrV4, TcpListener, UdpSocket};
use std::os::fd::{FromRawFd, RawFd};

use super::RawInterface;

fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
	if ret < 0 {
		Err(io::Error::last_os_error())
	} else {
		Ok(ret)
	}
}

fn to_sockaddr(addr: SocketAddrV4) -> libc::sockaddr_in {
	libc::sockaddr_in {
		sin_family: libc::AF_INET as libc::sa_family_t,
		sin_port: addr.port().to_be(),
		sin_addr: libc::in_addr { s_addr: u32::from_ne_bytes(addr.ip().octets()) },
		sin_zero: [0; 8],
		#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd", target_os = "netbsd", target_os = "openbsd"))]
		sin_len: 0,
	}
}

fn setsockopt(fd: RawFd, opt: libc::c_int, val: libc::c_int) -> io::Result<()> {
	let val: libc::c_int = val;

	unsafe {
		cvt(libc::setsockopt(
			fd,
			libc::SOL_SOCKET,
			opt,
			&val as *const _ as *const libc::c_void,
			mem::size_of::<libc::c_int>() as libc::socklen_t,
		))?;
	}

	Ok(())
}

/// Creates a raw, unbound socket of the given type with `SO_REUSEADDR` and
/// (where available) `SO_REUSEPORT` set, so the caller can bind it before
/// handing it off to `std::net`.
fn new_raw(ty: libc::c_int) -> io::Result<RawFd> {
	let fd = unsafe { cvt(libc::socket(libc::AF_INET, ty, 0))? };

	setsockopt(fd, libc::SO_REUSEADDR, 1)?;

	#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios", target_os = "freebsd", target_os = "netbsd", target_os = "openbsd"))]
	{
		if let Err(err) = setsockopt(fd, libc::SO_REUSEPORT, 1) {
			log::debug!("SO_REUSEPORT unavailable: {err}");
		}
	}

	Ok(fd)
}

fn bind_raw(fd: RawFd, addr: SocketAddrV4) -> io::Result<()> {
	let sa = to_sockaddr(addr);

	unsafe {
		cvt(libc::bind(fd, &sa as *const _ as *const libc::sockaddr, mem::size_of::<libc::sockaddr_in>() as libc::socklen_t))?;
	}

	Ok(())
}

pub fn new_tcp_listener(addr: SocketAddrV4, backlog: i32) -> io::Result<TcpListener> {
	let fd = new_raw(libc::SOCK_STREAM)?;

	bind_raw(fd, addr)?;

	unsafe {
		cvt(libc::listen(fd, backlog))?;
		Ok(TcpListener::from_raw_fd(fd))
	}
}

pub fn new_udp_socket(addr: SocketAddrV4) -> io::Result<UdpSocket> {
	let fd = new_raw(libc::SOCK_DGRAM)?;

	bind_raw(fd, addr)?;

	Ok(unsafe { UdpSocket::from_raw_fd(fd) })
}

/// Enumerates local interfaces via `getifaddrs(3)`.
pub fn enumerate_interfaces() -> io::Result<Vec<RawInterface>> {
	let mut head: *mut libc::ifaddrs = std::ptr::null_mut();

	unsafe {
		cvt(libc::getifaddrs(&mut head))?;
	}

	let mut out = Vec::new();
	let mut cur = head;

	while !cur.is_null() {
		let ifa = unsafe { &*cur };

		if !ifa.ifa_addr.is_null() {
			let family = unsafe { (*ifa.ifa_addr).sa_family as libc::c_int };

			if family == libc::AF_INET && ifa.ifa_flags as libc::c_int & libc::IFF_BROADCAST != 0 {
				let address = unsafe { sockaddr_in_to_ipv4(&*(ifa.ifa_addr as *const libc::sockaddr_in)) };

				let broadcast = if !ifa.ifa_ifu.is_null() {
					unsafe { sockaddr_in_to_ipv4(&*(ifa.ifa_ifu as *const libc::sockaddr_in)) }
				} else {
					Ipv4Addr::BROADCAST
				};

				let name = unsafe { CStr::from_ptr(ifa.ifa_name).to_string_lossy().into_owned() };

				out.push(RawInterface { name, address, broadcast });
			}
		}

		cur = ifa.ifa_next;
	}

	unsafe {
		libc::freeifaddrs(head);
	}

	Ok(out)
}

fn sockaddr_in_to_ipv4(sa: &libc::sockaddr_in) -> Ipv4Addr {
	Ipv4Addr::from(sa.sin_addr.s_addr.to_ne_bytes())
}
