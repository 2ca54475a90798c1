//! Client for the Linux process events connector.
//!
//! A [`Watcher`] subscribes to the kernel's `NETLINK_CONNECTOR` process events
//! multicast group and publishes every received message, decoded into a
//! [`ProcEvent`] or an [`Error`], on an ordered channel.
//!
//! ```no_run
//! use lib_proc_connector::Watcher;
//!
//! let watcher = Watcher::new();
//! watcher.start()?;
//! for res in watcher.events().iter().take(10) {
//! 	match res {
//! 		Ok(evt) => println!("{} {:?}", evt.event_type(), evt.data()),
//! 		Err(err) if err.is_fatal() => break,
//! 		Err(err) => eprintln!("{err}"),
//! 	}
//! }
//! watcher.stop();
//! # Ok::<(), lib_proc_connector::Error>(())
//! ```

// region:    --- Modules
mod config;
mod decode;
mod error;
mod event;
mod recv_loop;
mod transport;
mod trx;
mod watcher;
pub mod wire;
// endregion: --- Modules

pub use config::{WatcherConfig, DEFAULT_RECV_BUFFER_SIZE, MIN_RECV_BUFFER_SIZE};
pub use decode::{decode_event, decode_message, frame_message};
pub use error::{Error, Result};
pub use event::{
	Ack, Comm, Coredump, DecodeError, EventData, EventHeader, EventType, Exec, Exit, Fork, IdChange, Pid, ProcEvent,
	Ptrace, Sid,
};
pub use transport::{Interrupt, NetlinkTransport, Received, Transport};
pub use trx::{new_channel, Rx, Tx};
pub use watcher::{Watcher, WatcherState};

/// One element of the event stream.
pub type WatchResult = core::result::Result<ProcEvent, Error>;
