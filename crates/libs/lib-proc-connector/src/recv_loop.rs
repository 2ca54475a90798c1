use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

use tracing::{debug, trace};

use crate::{
	decode::decode_message,
	transport::{Received, Transport},
	trx::Tx,
	WatchResult,
};

/// Sole reader of the transport. Publishes one element per received datagram
/// and ends on stop, interrupt, a fatal receive error, or once the consumer
/// has dropped its end of the stream.
pub(crate) struct RecvWorker<T: Transport> {
	transport: T,
	tx: Tx<WatchResult>,
	stop: Arc<AtomicBool>,
	buf: Vec<u8>,
}

impl<T: Transport> RecvWorker<T> {
	pub fn new(transport: T, tx: Tx<WatchResult>, stop: Arc<AtomicBool>, buf_size: usize) -> Self {
		RecvWorker {
			transport,
			tx,
			stop,
			buf: vec![0u8; buf_size],
		}
	}

	/// Runs until the loop ends and hands the transport back. The channel
	/// sender is dropped on return, which closes the stream.
	pub fn run(mut self) -> T {
		debug!("receive loop started on '{}'", self.tx.name());
		let mut published: u64 = 0;

		loop {
			if self.stopping() {
				break;
			}

			let n = match self.transport.recv(&mut self.buf) {
				Ok(Received::Datagram(n)) => n,
				Ok(Received::Interrupted) => break,
				Err(err) => {
					self.transport.close();
					self.publish(Err(err));
					break;
				}
			};

			// copied out of the buffer before it is reused
			let res = decode_message(&self.buf[..n]);
			if let Err(err) = &res {
				trace!("undecodable datagram: {err}");
			}

			if !self.publish(res) {
				break;
			}
			published += 1;
		}

		debug!("receive loop exited after {published} elements");
		self.transport
	}

	fn stopping(&self) -> bool {
		self.stop.load(Ordering::Acquire)
	}

	/// Returns false when the element was discarded and the loop must end.
	fn publish(&self, res: WatchResult) -> bool {
		if self.stopping() {
			return false;
		}
		self.tx.send_sync(res).is_ok()
	}
}

// region:    --- Tests


// endregion: --- Tests
