use std::{
	collections::VecDeque,
	io,
	sync::{Arc, Condvar, Mutex},
};

use crate::{
	error::{Error, Result},
	transport::{Interrupt, Received, Transport},
	wire,
};

pub(crate) enum Step {
	Datagram(Vec<u8>),
	Fail(io::ErrorKind),
}

#[derive(Default)]
pub(crate) struct FakeStats {
	pub opens: usize,
	pub closes: usize,
	pub subscribes: Vec<bool>,
	pub last_subscribe_msg: Vec<u8>,
	pub open: bool,
	interrupted: bool,
}

#[derive(Default)]
pub(crate) struct FakeShared {
	stats: Mutex<FakeStats>,
	cond: Condvar,
}

impl FakeShared {
	pub fn with_stats<R>(&self, f: impl FnOnce(&FakeStats) -> R) -> R {
		let stats = self.stats.lock().unwrap_or_else(|p| p.into_inner());
		f(&stats)
	}
}

impl Interrupt for FakeShared {
	fn interrupt(&self) {
		let mut stats = self.stats.lock().unwrap_or_else(|p| p.into_inner());
		stats.interrupted = true;
		self.cond.notify_all();
	}
}

/// Plays back a script of datagrams and receive failures. When the script is
/// exhausted it either repeats a datagram forever or blocks until interrupted.
#[derive(Default)]
pub(crate) struct FakeTransport {
	shared: Arc<FakeShared>,
	steps: VecDeque<Step>,
	repeat: Option<Vec<u8>>,
	fail_open: bool,
	fail_subscribe: bool,
}

impl FakeTransport {
	pub fn new(steps: Vec<Step>) -> Self {
		Self {
			steps: steps.into(),
			..Default::default()
		}
	}

	pub fn repeating(datagram: Vec<u8>) -> Self {
		Self {
			repeat: Some(datagram),
			..Default::default()
		}
	}

	pub fn failing_open() -> Self {
		Self {
			fail_open: true,
			..Default::default()
		}
	}

	pub fn failing_subscribe() -> Self {
		Self {
			fail_subscribe: true,
			..Default::default()
		}
	}

	pub fn shared(&self) -> Arc<FakeShared> {
		self.shared.clone()
	}

	fn fill(buf: &mut [u8], datagram: &[u8]) -> Received {
		let n = datagram.len().min(buf.len());
		buf[..n].copy_from_slice(&datagram[..n]);
		Received::Datagram(n)
	}
}

impl Transport for FakeTransport {
	fn open(&mut self) -> Result<()> {
		if self.fail_open {
			return Err(Error::Socket(io::Error::from(io::ErrorKind::PermissionDenied)));
		}
		let mut stats = self.shared.stats.lock()?;
		stats.opens += 1;
		stats.open = true;
		stats.interrupted = false;
		Ok(())
	}

	fn subscribe(&mut self, listen: bool) -> Result<()> {
		if self.fail_subscribe {
			return Err(Error::Subscribe(io::Error::from(io::ErrorKind::BrokenPipe)));
		}
		let mut stats = self.shared.stats.lock()?;
		stats.subscribes.push(listen);
		stats.last_subscribe_msg = wire::subscribe_message(listen, std::process::id());
		Ok(())
	}

	fn recv(&mut self, buf: &mut [u8]) -> Result<Received> {
		let mut stats = self.shared.stats.lock()?;
		if stats.interrupted {
			return Ok(Received::Interrupted);
		}
		drop(stats);

		match self.steps.pop_front() {
			Some(Step::Datagram(datagram)) => return Ok(Self::fill(buf, &datagram)),
			Some(Step::Fail(kind)) => return Err(Error::Receive(io::Error::from(kind))),
			None => {}
		}

		if let Some(datagram) = &self.repeat {
			return Ok(Self::fill(buf, datagram));
		}

		stats = self.shared.stats.lock()?;
		while !stats.interrupted {
			stats = self.shared.cond.wait(stats)?;
		}
		Ok(Received::Interrupted)
	}

	fn interrupter(&self) -> Result<Arc<dyn Interrupt>> {
		Ok(self.shared.clone() as Arc<dyn Interrupt>)
	}

	fn is_open(&self) -> bool {
		self.shared.with_stats(|s| s.open)
	}

	fn close(&mut self) {
		let mut stats = self.shared.stats.lock().unwrap_or_else(|p| p.into_inner());
		if stats.open {
			stats.open = false;
			stats.closes += 1;
		}
	}
}
