//! Kernel channel access, abstracted so the receive loop can run over a scripted transport.

#[cfg(test)]
pub(crate) mod fake;
mod netlink;

pub use netlink::NetlinkTransport;

use std::sync::Arc;

use crate::error::Result;

/// Outcome of one receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
	/// A datagram of this many bytes was written to the buffer.
	Datagram(usize),
	/// The pending receive was woken through the transport's [`Interrupt`].
	Interrupted,
}

/// Wakes a receive blocked on the transport. Once fired, every later receive
/// returns [`Received::Interrupted`] until the transport is reopened.
pub trait Interrupt: Send + Sync {
	fn interrupt(&self);
}

pub trait Transport: Send + 'static {
	/// Creates the socket and joins the process events multicast group.
	/// Fails with `Error::Socket`.
	fn open(&mut self) -> Result<()>;

	/// Sends the subscribe (`listen = true`) or unsubscribe request as one message.
	/// Fails with `Error::Subscribe` or `Error::SubscribeShortWrite`.
	fn subscribe(&mut self, listen: bool) -> Result<()>;

	/// Blocks for one datagram. Fails with `Error::Receive`.
	fn recv(&mut self, buf: &mut [u8]) -> Result<Received>;

	/// Handle able to wake a blocked [`Transport::recv`] from another thread.
	fn interrupter(&self) -> Result<Arc<dyn Interrupt>>;

	fn is_open(&self) -> bool;

	/// Idempotent.
	fn close(&mut self);
}
