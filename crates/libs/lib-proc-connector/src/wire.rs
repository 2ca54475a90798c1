//! Byte layouts of the netlink connector messages exchanged with the kernel.
//!
//! All integers are native-endian, as produced by the kernel. Every struct is
//! `repr(C)` without implicit padding so it can be read from and written to a
//! byte buffer with `zerocopy`.

use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// `NETLINK_CONNECTOR` protocol number for `socket(2)`.
pub const NETLINK_CONNECTOR: i32 = 11;

/// Multicast class of the process events connector (`CN_IDX_PROC`, `CN_VAL_PROC`).
pub const CN_IDX_PROC: u32 = 1;
pub const CN_VAL_PROC: u32 = 1;

/// Netlink multicast group the socket binds to.
pub const PROC_EVENTS_GROUP: u32 = CN_IDX_PROC;

/// `NLMSG_DONE`, the envelope type used for connector messages.
pub const NLMSG_DONE: u16 = 3;

/// Values of the subscription payload (`enum proc_cn_mcast_op`).
pub const PROC_CN_MCAST_LISTEN: u32 = 1;
pub const PROC_CN_MCAST_IGNORE: u32 = 0;

pub const NLMSG_HDR_LEN: usize = size_of::<NlMsgHdr>();
pub const CN_MSG_HDR_LEN: usize = size_of::<CnMsgHdr>();
pub const EVENT_HDR_LEN: usize = size_of::<ProcEventHdr>();

/// Offset of the event header inside a received datagram.
pub const EVENT_OFFSET: usize = NLMSG_HDR_LEN + CN_MSG_HDR_LEN;

/// Smallest datagram that can carry a process event.
pub const MIN_MESSAGE_LEN: usize = EVENT_OFFSET + EVENT_HDR_LEN;

pub const TASK_COMM_LEN: usize = 16;

// region:    --- Headers

/// Envelope header (`struct nlmsghdr`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
	/// Total message length, header included.
	pub len: u32,
	pub msg_type: u16,
	pub flags: u16,
	pub seq: u32,
	pub pid: u32,
}

/// Connector routing id (`struct cb_id`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CbId {
	pub idx: u32,
	pub val: u32,
}

impl CbId {
	pub const PROC: CbId = CbId {
		idx: CN_IDX_PROC,
		val: CN_VAL_PROC,
	};
}

/// Connector message header (`struct cn_msg`), followed by `len` payload bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CnMsgHdr {
	pub id: CbId,
	pub seq: u32,
	pub ack: u32,
	pub len: u16,
	pub flags: u16,
}

/// Leading part of `struct proc_event`.
///
/// The kernel declares `timestamp_ns` 8-byte aligned, but the header sits at
/// offset 36 of a datagram, so it is always copied out rather than borrowed.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ProcEventHdr {
	pub what: u32,
	pub cpu: u32,
	/// Nanoseconds since boot.
	pub timestamp_ns: u64,
}

// endregion: --- Headers

// region:    --- Payloads

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct AckRaw {
	pub err: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ForkRaw {
	pub parent_pid: u32,
	pub parent_tgid: u32,
	pub child_pid: u32,
	pub child_tgid: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ExecRaw {
	pub process_pid: u32,
	pub process_tgid: u32,
}

/// Shared by the uid and gid events; `real`/`effective` hold ruid/euid or rgid/egid.
#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IdRaw {
	pub process_pid: u32,
	pub process_tgid: u32,
	pub real: u32,
	pub effective: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SidRaw {
	pub process_pid: u32,
	pub process_tgid: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct PtraceRaw {
	pub process_pid: u32,
	pub process_tgid: u32,
	pub tracer_pid: u32,
	pub tracer_tgid: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CommRaw {
	pub process_pid: u32,
	pub process_tgid: u32,
	pub comm: [u8; TASK_COMM_LEN],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CoredumpRaw {
	pub process_pid: u32,
	pub process_tgid: u32,
	pub parent_pid: u32,
	pub parent_tgid: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ExitRaw {
	pub process_pid: u32,
	pub process_tgid: u32,
	pub exit_code: u32,
	pub exit_signal: u32,
	pub parent_pid: u32,
	pub parent_tgid: u32,
}

// endregion: --- Payloads

// region:    --- Subscribe Message

/// Builds the three segments of a subscribe request: envelope, connector header
/// and the 4-byte multicast op.
pub fn subscribe_segments(listen: bool, pid: u32) -> (NlMsgHdr, CnMsgHdr, u32) {
	let op = if listen { PROC_CN_MCAST_LISTEN } else { PROC_CN_MCAST_IGNORE };

	let nl_hdr = NlMsgHdr {
		len: (NLMSG_HDR_LEN + CN_MSG_HDR_LEN + size_of::<u32>()) as u32,
		msg_type: NLMSG_DONE,
		flags: 0,
		seq: 0,
		pid,
	};

	let cn_hdr = CnMsgHdr {
		id: CbId::PROC,
		seq: 0,
		ack: 0,
		len: size_of::<u32>() as u16,
		flags: 0,
	};

	(nl_hdr, cn_hdr, op)
}

/// Contiguous form of [`subscribe_segments`], as it appears on the wire.
pub fn subscribe_message(listen: bool, pid: u32) -> Vec<u8> {
	use zerocopy::IntoBytes;

	let (nl_hdr, cn_hdr, op) = subscribe_segments(listen, pid);

	let mut buf = Vec::with_capacity(nl_hdr.len as usize);
	buf.extend_from_slice(nl_hdr.as_bytes());
	buf.extend_from_slice(cn_hdr.as_bytes());
	buf.extend_from_slice(op.as_bytes());
	buf
}

// endregion: --- Subscribe Message

// region:    --- Tests


// endregion: --- Tests
