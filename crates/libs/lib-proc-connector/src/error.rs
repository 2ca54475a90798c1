use derive_more::{Display, From};
use flume::{RecvError, SendError};

use crate::event::{DecodeError, EventType};
use crate::watcher::WatcherState;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
	#[from(String, &String, &str)]
	#[display("{_0}")]
	Custom(String),

	// -- Setup (returned from `Watcher::start`)
	#[display("Socket error: {_0}")]
	Socket(std::io::Error),
	#[display("Subscribe error: {_0}")]
	Subscribe(std::io::Error),
	#[display("Subscribe short write: {written} of {expected} bytes")]
	SubscribeShortWrite {
		written: usize,
		expected: usize,
	},

	// -- Stream (delivered on the event channel)
	#[display("Receive error: {_0}")]
	Receive(std::io::Error),
	#[display("Malformed message: declared {declared} bytes, received {received}, need at least {min}")]
	MalformedMessage {
		declared: u32,
		received: usize,
		min: usize,
	},
	#[display("Unexpected connector id {idx}:{val}")]
	UnexpectedConnector {
		idx: u32,
		val: u32,
	},
	#[display("Truncated {event_type} payload: need {needed} bytes, got {available}")]
	TruncatedPayload {
		event_type: EventType,
		needed: usize,
		available: usize,
	},

	// -- Lifecycle
	#[display("Invalid state for {op}: {state}")]
	InvalidState {
		op: &'static str,
		state: WatcherState,
	},

	#[from]
	#[display("{_0}")]
	Decode(DecodeError),

	#[display("Event send error: {_0}")]
	EventSend(String),
	#[display("Event recv error: {_0}")]
	EventRecv(RecvError),
	#[display("Poisoned lock")]
	LockPoison,

	// -- Externals
	#[from]
	#[display("{_0}")]
	Io(std::io::Error),
}

impl Error {
	/// A fatal error terminates the event stream; every other stream error is
	/// followed by further elements.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Error::Receive(_))
	}
}

impl<T> From<std::sync::PoisonError<T>> for Error {
	fn from(_val: std::sync::PoisonError<T>) -> Self {
		Self::LockPoison
	}
}

impl<T> From<SendError<T>> for Error {
	fn from(value: SendError<T>) -> Self {
		Self::EventSend(value.to_string())
	}
}

impl From<RecvError> for Error {
	fn from(err: RecvError) -> Self {
		Self::EventRecv(err)
	}
}

// region:    --- Custom

impl Error {
	pub fn custom_from_err(err: impl std::error::Error) -> Self {
		Self::Custom(err.to_string())
	}

	pub fn custom(val: impl Into<String>) -> Self {
		Self::Custom(val.into())
	}
}

// endregion: --- Custom

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
