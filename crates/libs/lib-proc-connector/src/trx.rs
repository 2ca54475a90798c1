//! Named FIFO channel halves carrying watch results from the receive loop to the consumer.

use flume::{Receiver, Sender, TryRecvError};

use crate::error::Result;

pub struct Tx<T> {
	name: &'static str,
	tx: Sender<T>,
}

impl<T> Tx<T> {
	/// Blocking send, for producers running on a plain thread.
	pub fn send_sync(&self, item: T) -> Result<()> {
		self.tx.send(item)?;
		Ok(())
	}

	pub async fn send(&self, item: T) -> Result<()> {
		self.tx.send_async(item).await?;
		Ok(())
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl<T> Clone for Tx<T> {
	fn clone(&self) -> Self {
		Self {
			name: self.name,
			tx: self.tx.clone(),
		}
	}
}

/// Receiving half, owned by a single consumer. It ends (every `recv` fails, the
/// stream yields `None`) once the last [`Tx`] is dropped and the queued items
/// are drained. Dropping it makes every later send fail.
pub struct Rx<T> {
	name: &'static str,
	rx: Receiver<T>,
}

impl<T> Rx<T> {
	pub async fn recv(&self) -> Result<T> {
		let res = self.rx.recv_async().await?;
		Ok(res)
	}

	pub fn recv_blocking(&self) -> Result<T> {
		let res = self.rx.recv()?;
		Ok(res)
	}

	/// `Ok(None)` when nothing is queued yet.
	pub fn try_recv(&self) -> Result<Option<T>> {
		match self.rx.try_recv() {
			Ok(item) => Ok(Some(item)),
			Err(TryRecvError::Empty) => Ok(None),
			Err(TryRecvError::Disconnected) => Err(flume::RecvError::Disconnected.into()),
		}
	}

	/// Blocking iterator, finished when the channel is closed.
	pub fn iter(&self) -> flume::Iter<'_, T> {
		self.rx.iter()
	}

	pub fn into_stream(self) -> flume::r#async::RecvStream<'static, T> {
		self.rx.into_stream()
	}

	pub fn is_closed(&self) -> bool {
		self.rx.is_disconnected()
	}

	pub fn len(&self) -> usize {
		self.rx.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rx.is_empty()
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}


pub fn new_channel<T>(name: &'static str) -> (Tx<T>, Rx<T>) {
	let (tx, rx) = flume::unbounded::<T>();

	let tx = Tx { name, tx };

	let rx = Rx { name, rx };

	(tx, rx)
}

// region:    --- Tests


// endregion: --- Tests
