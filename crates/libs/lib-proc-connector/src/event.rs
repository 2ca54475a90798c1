//! Typed process events, owned and detached from the receive buffer.

use derive_more::{Display, From};

pub type Pid = u32;

// region:    --- EventType

/// Event type tag (`enum proc_event::what`). Concrete events have exactly one bit set.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum EventType {
	#[display("NONE")]
	None,
	#[display("FORK")]
	Fork,
	#[display("EXEC")]
	Exec,
	#[display("UID")]
	Uid,
	#[display("GID")]
	Gid,
	#[display("SID")]
	Sid,
	#[display("PTRACE")]
	Ptrace,
	#[display("COMM")]
	Comm,
	#[display("COREDUMP")]
	Coredump,
	#[display("EXIT")]
	Exit,
	#[display("UNKNOWN({_0:#010x})")]
	Unknown(u32),
}

impl EventType {
	pub const RAW_NONE: u32 = 0x0000_0000;
	pub const RAW_FORK: u32 = 0x0000_0001;
	pub const RAW_EXEC: u32 = 0x0000_0002;
	pub const RAW_UID: u32 = 0x0000_0004;
	pub const RAW_GID: u32 = 0x0000_0040;
	pub const RAW_SID: u32 = 0x0000_0080;
	pub const RAW_PTRACE: u32 = 0x0000_0100;
	pub const RAW_COMM: u32 = 0x0000_0200;
	pub const RAW_COREDUMP: u32 = 0x4000_0000;
	pub const RAW_EXIT: u32 = 0x8000_0000;

	pub fn from_raw(what: u32) -> Self {
		match what {
			Self::RAW_NONE => EventType::None,
			Self::RAW_FORK => EventType::Fork,
			Self::RAW_EXEC => EventType::Exec,
			Self::RAW_UID => EventType::Uid,
			Self::RAW_GID => EventType::Gid,
			Self::RAW_SID => EventType::Sid,
			Self::RAW_PTRACE => EventType::Ptrace,
			Self::RAW_COMM => EventType::Comm,
			Self::RAW_COREDUMP => EventType::Coredump,
			Self::RAW_EXIT => EventType::Exit,
			other => EventType::Unknown(other),
		}
	}

	pub fn as_raw(&self) -> u32 {
		match self {
			EventType::None => Self::RAW_NONE,
			EventType::Fork => Self::RAW_FORK,
			EventType::Exec => Self::RAW_EXEC,
			EventType::Uid => Self::RAW_UID,
			EventType::Gid => Self::RAW_GID,
			EventType::Sid => Self::RAW_SID,
			EventType::Ptrace => Self::RAW_PTRACE,
			EventType::Comm => Self::RAW_COMM,
			EventType::Coredump => Self::RAW_COREDUMP,
			EventType::Exit => Self::RAW_EXIT,
			EventType::Unknown(raw) => *raw,
		}
	}
}

// endregion: --- EventType

// region:    --- DecodeError

/// Returned by the typed accessors of [`ProcEvent`] when the stored event is of another type.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum DecodeError {
	#[display("Event is {actual}, not {expected}")]
	VariantMismatch { expected: EventType, actual: EventType },
}

impl std::error::Error for DecodeError {}

// endregion: --- DecodeError

// region:    --- Payloads

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventHeader {
	pub event_type: EventType,
	pub cpu: u32,
	/// Nanoseconds since boot.
	pub timestamp_ns: u64,
}

/// Kernel acknowledgement of a subscribe request (type `NONE`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ack {
	pub err: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fork {
	pub parent_pid: Pid,
	pub parent_tgid: Pid,
	pub child_pid: Pid,
	pub child_tgid: Pid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exec {
	pub process_pid: Pid,
	pub process_tgid: Pid,
}

/// Credentials change. For a uid event `real`/`effective` are ruid/euid, for a gid event rgid/egid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdChange {
	pub process_pid: Pid,
	pub process_tgid: Pid,
	pub real: u32,
	pub effective: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sid {
	pub process_pid: Pid,
	pub process_tgid: Pid,
}

/// `tracer_pid == 0` means the tracer detached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ptrace {
	pub process_pid: Pid,
	pub process_tgid: Pid,
	pub tracer_pid: Pid,
	pub tracer_tgid: Pid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comm {
	pub process_pid: Pid,
	pub process_tgid: Pid,
	pub comm: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Coredump {
	pub process_pid: Pid,
	pub process_tgid: Pid,
	pub parent_pid: Pid,
	pub parent_tgid: Pid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exit {
	pub process_pid: Pid,
	pub process_tgid: Pid,
	pub exit_code: u32,
	pub exit_signal: u32,
	pub parent_pid: Pid,
	pub parent_tgid: Pid,
}

// endregion: --- Payloads

// region:    --- ProcEvent

/// Payload of a decoded event, one variant per event type.
#[derive(Clone, Debug, PartialEq, Eq, From)]
pub enum EventData {
	#[from]
	None(Ack),
	#[from]
	Fork(Fork),
	#[from]
	Exec(Exec),
	Uid(IdChange),
	Gid(IdChange),
	#[from]
	Sid(Sid),
	#[from]
	Ptrace(Ptrace),
	#[from]
	Comm(Comm),
	#[from]
	Coredump(Coredump),
	#[from]
	Exit(Exit),
	/// Type tag without a known payload layout; only the header is available.
	Unknown,
}

/// One decoded, bounds-checked process event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcEvent {
	header: EventHeader,
	data: EventData,
}

impl ProcEvent {
	pub fn new(header: EventHeader, data: EventData) -> Self {
		Self { header, data }
	}

	pub fn event_type(&self) -> EventType {
		self.header.event_type
	}

	pub fn header(&self) -> EventHeader {
		self.header
	}

	pub fn data(&self) -> &EventData {
		&self.data
	}

	pub fn into_data(self) -> EventData {
		self.data
	}

	pub fn as_ack(&self) -> Result<Ack, DecodeError> {
		match &self.data {
			EventData::None(v) => Ok(*v),
			_ => Err(self.mismatch(EventType::None)),
		}
	}

	pub fn as_fork(&self) -> Result<Fork, DecodeError> {
		match &self.data {
			EventData::Fork(v) => Ok(*v),
			_ => Err(self.mismatch(EventType::Fork)),
		}
	}

	pub fn as_exec(&self) -> Result<Exec, DecodeError> {
		match &self.data {
			EventData::Exec(v) => Ok(*v),
			_ => Err(self.mismatch(EventType::Exec)),
		}
	}

	pub fn as_uid(&self) -> Result<IdChange, DecodeError> {
		match &self.data {
			EventData::Uid(v) => Ok(*v),
			_ => Err(self.mismatch(EventType::Uid)),
		}
	}

	pub fn as_gid(&self) -> Result<IdChange, DecodeError> {
		match &self.data {
			EventData::Gid(v) => Ok(*v),
			_ => Err(self.mismatch(EventType::Gid)),
		}
	}

	pub fn as_sid(&self) -> Result<Sid, DecodeError> {
		match &self.data {
			EventData::Sid(v) => Ok(*v),
			_ => Err(self.mismatch(EventType::Sid)),
		}
	}

	pub fn as_ptrace(&self) -> Result<Ptrace, DecodeError> {
		match &self.data {
			EventData::Ptrace(v) => Ok(*v),
			_ => Err(self.mismatch(EventType::Ptrace)),
		}
	}

	pub fn as_comm(&self) -> Result<Comm, DecodeError> {
		match &self.data {
			EventData::Comm(v) => Ok(v.clone()),
			_ => Err(self.mismatch(EventType::Comm)),
		}
	}

	pub fn as_coredump(&self) -> Result<Coredump, DecodeError> {
		match &self.data {
			EventData::Coredump(v) => Ok(*v),
			_ => Err(self.mismatch(EventType::Coredump)),
		}
	}

	pub fn as_exit(&self) -> Result<Exit, DecodeError> {
		match &self.data {
			EventData::Exit(v) => Ok(*v),
			_ => Err(self.mismatch(EventType::Exit)),
		}
	}

	fn mismatch(&self, expected: EventType) -> DecodeError {
		DecodeError::VariantMismatch {
			expected,
			actual: self.header.event_type,
		}
	}
}

// endregion: --- ProcEvent

// region:    --- Tests


// endregion: --- Tests
