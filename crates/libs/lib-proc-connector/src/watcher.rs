//! Public lifecycle of a process events subscription: `Idle -> Running -> Stopped`.

use std::{
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc, Mutex,
	},
	thread::{self, JoinHandle},
};

use derive_more::Display;
use tracing::debug;

use crate::{
	config::WatcherConfig,
	error::{Error, Result},
	recv_loop::RecvWorker,
	transport::{Interrupt, NetlinkTransport, Transport},
	trx::{new_channel, Rx, Tx},
	WatchResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WatcherState {
	Idle,
	Running,
	Stopped,
}

struct Session<T> {
	stop: Arc<AtomicBool>,
	interrupt: Arc<dyn Interrupt>,
	handle: JoinHandle<T>,
}

enum Inner<T> {
	Idle { transport: T, tx: Tx<WatchResult> },
	Running(Session<T>),
	Stopped,
}

impl<T> Inner<T> {
	fn state(&self) -> WatcherState {
		match self {
			Inner::Idle { .. } => WatcherState::Idle,
			Inner::Running(_) => WatcherState::Running,
			Inner::Stopped => WatcherState::Stopped,
		}
	}
}

/// Subscribes to kernel process events and delivers them on [`Watcher::events`].
///
/// `start` may be called once. `stop` is safe from any thread, blocks until the
/// receive loop has exited, and is a no-op unless the watcher is running.
/// Dropping a running watcher stops it.
pub struct Watcher<T: Transport = NetlinkTransport> {
	config: WatcherConfig,
	inner: Mutex<Inner<T>>,
	rx: Mutex<Option<Rx<WatchResult>>>,
}

impl Watcher<NetlinkTransport> {
	pub fn new() -> Self {
		Self::with_config(WatcherConfig::default())
	}

	pub fn with_config(config: WatcherConfig) -> Self {
		Self::with_transport(NetlinkTransport::new(), config)
	}
}

impl Default for Watcher<NetlinkTransport> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Transport> Watcher<T> {
	pub fn with_transport(transport: T, config: WatcherConfig) -> Self {
		let (tx, rx) = new_channel::<WatchResult>("proc_events");

		Watcher {
			config,
			inner: Mutex::new(Inner::Idle { transport, tx }),
			rx: Mutex::new(Some(rx)),
		}
	}

	pub fn state(&self) -> WatcherState {
		self.inner.lock().unwrap_or_else(|p| p.into_inner()).state()
	}

	/// Opens the socket, subscribes and spawns the receive loop.
	///
	/// On a socket or subscribe failure the watcher stays `Idle`.
	pub fn start(&self) -> Result<()> {
		let mut inner = self.inner.lock()?;

		let (mut transport, tx) = match std::mem::replace(&mut *inner, Inner::Stopped) {
			Inner::Idle { transport, tx } => (transport, tx),
			other => {
				let state = other.state();
				*inner = other;
				return Err(Error::InvalidState { op: "start", state });
			}
		};

		let interrupt = match connect(&mut transport) {
			Ok(interrupt) => interrupt,
			Err(err) => {
				transport.close();
				*inner = Inner::Idle { transport, tx };
				return Err(err);
			}
		};

		let stop = Arc::new(AtomicBool::new(false));
		let worker = RecvWorker::new(transport, tx, stop.clone(), self.config.recv_buffer_size());

		// a failed spawn drops the worker, closing both the socket and the stream
		let handle = thread::Builder::new()
			.name(self.config.thread_name().to_string())
			.spawn(move || worker.run())?;

		*inner = Inner::Running(Session { stop, interrupt, handle });
		debug!("watcher started");

		Ok(())
	}

	/// Stops the receive loop, waits for it to exit, then unsubscribes and
	/// closes the socket. The event stream is closed once this returns.
	pub fn stop(&self) {
		let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());

		let session = match std::mem::replace(&mut *inner, Inner::Stopped) {
			Inner::Running(session) => session,
			other => {
				*inner = other;
				return;
			}
		};

		debug!("watcher stopping");
		session.stop.store(true, Ordering::Release);
		session.interrupt.interrupt();

		match session.handle.join() {
			Ok(mut transport) => {
				if transport.is_open() {
					// best effort, the socket goes away right after
					let _ = transport.subscribe(false);
				}
				transport.close();
			}
			Err(_) => debug!("receive loop panicked"),
		}

		debug!("watcher stopped");
	}

	/// Ordered stream of watch results, handed out to a single consumer. It ends
	/// after the watcher stops or the receive loop hits a fatal error. Dropping
	/// it ends the receive loop at its next datagram.
	///
	/// Every call after the first returns an already closed stream.
	pub fn events(&self) -> Rx<WatchResult> {
		let taken = self.rx.lock().unwrap_or_else(|p| p.into_inner()).take();
		taken.unwrap_or_else(|| {
			let (_, rx) = new_channel::<WatchResult>("proc_events");
			rx
		})
	}

	pub fn config(&self) -> &WatcherConfig {
		&self.config
	}
}

impl<T: Transport> Drop for Watcher<T> {
	fn drop(&mut self) {
		self.stop();
	}
}

fn connect<T: Transport>(transport: &mut T) -> Result<Arc<dyn Interrupt>> {
	transport.open()?;
	transport.subscribe(true)?;
	transport.interrupter()
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::{
		decode::tests::fx_fork_datagram,
		transport::fake::{FakeTransport, Step},
		wire,
	};
	use futures::StreamExt;
	use std::io;

	fn fx_watcher(transport: FakeTransport) -> Watcher<FakeTransport> {
		Watcher::with_transport(transport, WatcherConfig::default())
	}

	#[test]
	fn watcher_start_twice_is_invalid_state() -> Result<()> {
		// -- Setup & Fixtures
		let fx_transport = FakeTransport::new(vec![]);
		let shared = fx_transport.shared();
		let watcher = fx_watcher(fx_transport);

		// -- Exec
		watcher.start()?;
		let res = watcher.start();

		// -- Check
		assert!(matches!(
			res,
			Err(Error::InvalidState {
				op: "start",
				state: WatcherState::Running,
			})
		));
		assert_eq!(shared.with_stats(|s| s.opens), 1);
		assert_eq!(watcher.state(), WatcherState::Running);

		watcher.stop();
		Ok(())
	}

	#[test]
	fn watcher_start_open_failure_stays_idle() -> Result<()> {
		// -- Setup & Fixtures
		let watcher = fx_watcher(FakeTransport::failing_open());

		// -- Exec
		let res = watcher.start();

		// -- Check
		assert!(matches!(res, Err(Error::Socket(_))));
		assert_eq!(watcher.state(), WatcherState::Idle);
		assert!(!watcher.events().is_closed());

		Ok(())
	}

	#[test]
	fn watcher_start_subscribe_failure_closes_socket() -> Result<()> {
		// -- Setup & Fixtures
		let fx_transport = FakeTransport::failing_subscribe();
		let shared = fx_transport.shared();
		let watcher = fx_watcher(fx_transport);

		// -- Exec
		let res = watcher.start();

		// -- Check
		assert!(matches!(res, Err(Error::Subscribe(_))));
		assert_eq!(watcher.state(), WatcherState::Idle);
		assert_eq!(shared.with_stats(|s| (s.opens, s.closes)), (1, 1));

		Ok(())
	}

	#[test]
	fn watcher_stop_lifecycle_edges() -> Result<()> {
		// -- Setup & Fixtures
		let watcher = fx_watcher(FakeTransport::new(vec![]));

		// -- Exec & Check
		// stop while idle is a no-op
		watcher.stop();
		assert_eq!(watcher.state(), WatcherState::Idle);

		watcher.start()?;
		watcher.stop();
		watcher.stop();
		assert_eq!(watcher.state(), WatcherState::Stopped);

		let res = watcher.start();
		assert!(matches!(
			res,
			Err(Error::InvalidState {
				state: WatcherState::Stopped,
				..
			})
		));

		// stream is exhausted, not an error source
		assert!(watcher.events().iter().next().is_none());

		Ok(())
	}

	#[test]
	fn watcher_delivers_in_order_then_closes_on_stop() -> Result<()> {
		// -- Setup & Fixtures
		let steps = (1..=5).map(|pid| Step::Datagram(fx_fork_datagram(pid))).collect();
		let fx_transport = FakeTransport::new(steps);
		let shared = fx_transport.shared();
		let watcher = fx_watcher(fx_transport);
		let events = watcher.events();

		// -- Exec
		watcher.start()?;
		let mut pids = Vec::new();
		for _ in 0..5 {
			let evt = events.recv_blocking()?.map_err(|e| e.to_string())?;
			pids.push(evt.as_fork()?.child_pid);
		}
		watcher.stop();

		// -- Check
		assert_eq!(pids, vec![1, 2, 3, 4, 5]);
		assert!(events.iter().next().is_none());
		assert!(events.is_closed());
		shared.with_stats(|s| {
			assert_eq!(s.subscribes, vec![true, false]);
			assert_eq!(s.closes, 1);
			assert!(!s.open);
		});

		Ok(())
	}

	#[test]
	fn watcher_subscribe_handshake_bytes() -> Result<()> {
		// -- Setup & Fixtures
		let fx_transport = FakeTransport::new(vec![]);
		let shared = fx_transport.shared();
		let watcher = fx_watcher(fx_transport);

		// -- Exec
		watcher.start()?;
		let sent = shared.with_stats(|s| s.last_subscribe_msg.clone());
		watcher.stop();

		// -- Check
		assert_eq!(sent, wire::subscribe_message(true, std::process::id()));
		// routing id {1, 1} right after the envelope header
		assert_eq!(&sent[16..24], &[1u32.to_ne_bytes(), 1u32.to_ne_bytes()].concat()[..]);

		Ok(())
	}

	#[test]
	fn watcher_many_start_stop_cycles_under_load() -> Result<()> {
		for cycle in 0..200 {
			// -- Setup & Fixtures
			let watcher = Arc::new(fx_watcher(FakeTransport::repeating(fx_fork_datagram(cycle))));
			let events = watcher.events();

			// -- Exec
			let consumer = thread::spawn(move || events.iter().count());
			watcher.start()?;
			if cycle % 2 == 0 {
				thread::yield_now();
			}
			let stopper = {
				let watcher = watcher.clone();
				thread::spawn(move || watcher.stop())
			};
			stopper.join().map_err(|_| "stopper panicked")?;
			watcher.stop();

			// -- Check
			// the consumer only returns once the stream is closed
			let _count = consumer.join().map_err(|_| "consumer panicked")?;
			assert_eq!(watcher.state(), WatcherState::Stopped);
		}

		Ok(())
	}

	#[test]
	fn watcher_drop_stops_running_loop() -> Result<()> {
		// -- Setup & Fixtures
		let fx_transport = FakeTransport::new(vec![]);
		let shared = fx_transport.shared();
		let watcher = fx_watcher(fx_transport);
		let events = watcher.events();
		watcher.start()?;

		// -- Exec
		drop(watcher);

		// -- Check
		assert!(events.iter().next().is_none());
		assert_eq!(shared.with_stats(|s| s.closes), 1);

		Ok(())
	}

	#[test]
	fn watcher_events_has_a_single_consumer() -> Result<()> {
		// -- Setup & Fixtures
		let steps = (1..=6).map(|pid| Step::Datagram(fx_fork_datagram(pid))).collect();
		let watcher = fx_watcher(FakeTransport::new(steps));
		let events = watcher.events();
		let late = watcher.events();

		// -- Exec
		watcher.start()?;
		let mut pids = Vec::new();
		for _ in 0..6 {
			let evt = events.recv_blocking()?.map_err(|e| e.to_string())?;
			pids.push(evt.as_fork()?.child_pid);
		}
		watcher.stop();

		// -- Check
		assert_eq!(pids, vec![1, 2, 3, 4, 5, 6]);
		assert!(late.is_closed());
		assert!(late.iter().next().is_none());

		Ok(())
	}

	#[test]
	fn watcher_dropped_consumer_ends_receive_loop() -> Result<()> {
		// -- Setup & Fixtures
		let watcher = fx_watcher(FakeTransport::repeating(fx_fork_datagram(5)));
		drop(watcher.events());

		// -- Exec
		watcher.start()?;
		let mut finished = false;
		for _ in 0..500 {
			let inner = watcher.inner.lock().map_err(|_| "poisoned lock")?;
			if let Inner::Running(session) = &*inner {
				finished = session.handle.is_finished();
			}
			drop(inner);
			if finished {
				break;
			}
			thread::sleep(std::time::Duration::from_millis(10));
		}

		// -- Check
		assert!(finished, "receive loop still running without a consumer");
		assert_eq!(watcher.state(), WatcherState::Running);
		watcher.stop();
		assert_eq!(watcher.state(), WatcherState::Stopped);

		Ok(())
	}

	#[tokio::test]
	async fn watcher_stream_ends_after_fatal_error() -> Result<()> {
		// -- Setup & Fixtures
		let fx_transport = FakeTransport::new(vec![
			Step::Datagram(fx_fork_datagram(10)),
			Step::Datagram(fx_fork_datagram(11)),
			Step::Fail(io::ErrorKind::ConnectionAborted),
		]);
		let watcher = fx_watcher(fx_transport);
		let mut stream = watcher.events().into_stream();

		// -- Exec
		watcher.start()?;
		let mut results = Vec::new();
		while let Some(res) = stream.next().await {
			results.push(res);
		}

		// -- Check
		assert_eq!(results.len(), 3);
		assert!(results[0].is_ok());
		assert!(results[1].is_ok());
		assert!(matches!(&results[2], Err(Error::Receive(err)) if err.kind() == io::ErrorKind::ConnectionAborted));

		// loop already exited on its own; stop still joins cleanly
		watcher.stop();
		assert_eq!(watcher.state(), WatcherState::Stopped);

		Ok(())
	}
}

// endregion: --- Tests
