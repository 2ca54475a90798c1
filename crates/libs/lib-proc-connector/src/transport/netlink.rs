use std::{
	io,
	os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
	sync::Arc,
};

use tracing::{debug, trace};
use zerocopy::IntoBytes;

use crate::{
	error::{Error, Result},
	transport::{Interrupt, Received, Transport},
	wire::{self, NETLINK_CONNECTOR, PROC_EVENTS_GROUP},
};

/// Netlink connector socket subscribed to the kernel's process events.
///
/// Requires `CAP_NET_ADMIN` (in practice root).
#[derive(Default)]
pub struct NetlinkTransport {
	sock: Option<OwnedFd>,
	wake: Option<Arc<EventFd>>,
}

impl NetlinkTransport {
	pub fn new() -> Self {
		Self::default()
	}
}

impl Transport for NetlinkTransport {
	fn open(&mut self) -> Result<()> {
		if self.sock.is_some() {
			return Ok(());
		}

		let sock = open_socket().map_err(Error::Socket)?;
		let wake = EventFd::new().map_err(Error::Socket)?;
		debug!("netlink connector socket opened (fd {})", sock.as_raw_fd());

		self.sock = Some(sock);
		self.wake = Some(Arc::new(wake));
		Ok(())
	}

	fn subscribe(&mut self, listen: bool) -> Result<()> {
		let sock = self.sock.as_ref().ok_or_else(|| Error::Subscribe(not_open()))?;

		let (nl_hdr, cn_hdr, op) = wire::subscribe_segments(listen, std::process::id());
		let segments: [&[u8]; 3] = [nl_hdr.as_bytes(), cn_hdr.as_bytes(), op.as_bytes()];
		let expected: usize = segments.iter().map(|s| s.len()).sum();

		let iov = segments.map(|s| libc::iovec {
			iov_base: s.as_ptr() as *mut libc::c_void,
			iov_len: s.len(),
		});

		let written = loop {
			let ret = unsafe { libc::writev(sock.as_raw_fd(), iov.as_ptr(), iov.len() as libc::c_int) };
			if ret >= 0 {
				break ret as usize;
			}
			let err = io::Error::last_os_error();
			if err.kind() != io::ErrorKind::Interrupted {
				return Err(Error::Subscribe(err));
			}
		};

		if written != expected {
			return Err(Error::SubscribeShortWrite { written, expected });
		}

		debug!("proc connector {}", if listen { "subscribed" } else { "unsubscribed" });
		Ok(())
	}

	fn recv(&mut self, buf: &mut [u8]) -> Result<Received> {
		let sock = self.sock.as_ref().ok_or_else(|| Error::Receive(not_open()))?;
		let wake = self.wake.as_ref().ok_or_else(|| Error::Receive(not_open()))?;

		let mut fds = [
			libc::pollfd {
				fd: sock.as_raw_fd(),
				events: libc::POLLIN,
				revents: 0,
			},
			libc::pollfd {
				fd: wake.raw_fd(),
				events: libc::POLLIN,
				revents: 0,
			},
		];

		loop {
			fds[0].revents = 0;
			fds[1].revents = 0;

			let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
			if ret < 0 {
				let err = io::Error::last_os_error();
				if err.kind() == io::ErrorKind::Interrupted {
					continue;
				}
				return Err(Error::Receive(err));
			}

			// a pending stop wins over queued data
			if fds[1].revents & libc::POLLIN != 0 {
				trace!("netlink recv interrupted");
				return Ok(Received::Interrupted);
			}

			if fds[0].revents == 0 {
				continue;
			}

			let n = unsafe { libc::recv(sock.as_raw_fd(), buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) };
			if n < 0 {
				let err = io::Error::last_os_error();
				if err.kind() == io::ErrorKind::Interrupted {
					continue;
				}
				return Err(Error::Receive(err));
			}

			return Ok(Received::Datagram(n as usize));
		}
	}

	fn interrupter(&self) -> Result<Arc<dyn Interrupt>> {
		let wake = self.wake.clone().ok_or_else(|| Error::Socket(not_open()))?;
		Ok(wake as Arc<dyn Interrupt>)
	}

	fn is_open(&self) -> bool {
		self.sock.is_some()
	}

	fn close(&mut self) {
		if let Some(sock) = self.sock.take() {
			debug!("netlink connector socket closed (fd {})", sock.as_raw_fd());
		}
		self.wake = None;
	}
}

fn open_socket() -> io::Result<OwnedFd> {
	let fd = unsafe { libc::socket(libc::AF_NETLINK, libc::SOCK_DGRAM | libc::SOCK_CLOEXEC, NETLINK_CONNECTOR) };
	if fd < 0 {
		return Err(io::Error::last_os_error());
	}
	let sock = unsafe { OwnedFd::from_raw_fd(fd) };

	let mut addr: libc::sockaddr_nl = unsafe { std::mem::zeroed() };
	addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;
	// kernel assigns the port id
	addr.nl_pid = 0;
	addr.nl_groups = PROC_EVENTS_GROUP;

	let ret = unsafe {
		libc::bind(
			sock.as_raw_fd(),
			&addr as *const libc::sockaddr_nl as *const libc::sockaddr,
			size_of::<libc::sockaddr_nl>() as libc::socklen_t,
		)
	};
	if ret < 0 {
		return Err(io::Error::last_os_error());
	}

	Ok(sock)
}

fn not_open() -> io::Error {
	io::Error::from_raw_os_error(libc::EBADF)
}

// region:    --- EventFd

/// Level-triggered wake-up: once written it stays readable, so every later poll sees it.
struct EventFd {
	fd: OwnedFd,
}

impl EventFd {
	fn new() -> io::Result<Self> {
		let fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK) };
		if fd < 0 {
			return Err(io::Error::last_os_error());
		}
		Ok(Self {
			fd: unsafe { OwnedFd::from_raw_fd(fd) },
		})
	}

	fn raw_fd(&self) -> RawFd {
		self.fd.as_raw_fd()
	}
}

impl Interrupt for EventFd {
	fn interrupt(&self) {
		let one: u64 = 1;
		// EAGAIN only if the counter is saturated, which still leaves it readable
		let _ = unsafe { libc::write(self.fd.as_raw_fd(), one.as_bytes().as_ptr() as *const libc::c_void, 8) };
	}
}

// endregion: --- EventFd

// region:    --- Tests


// endregion: --- Tests
