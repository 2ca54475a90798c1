//! Framing and decoding of received connector datagrams.
//!
//! Every field is copied out of the buffer at a fixed offset after its length
//! has been checked, so a decoded [`ProcEvent`] never borrows the receive buffer.

use zerocopy::FromBytes;

use crate::error::{Error, Result};
use crate::event::{
	Ack, Comm, Coredump, EventData, EventHeader, EventType, Exec, Exit, Fork, IdChange, ProcEvent, Ptrace, Sid,
};
use crate::wire::{
	AckRaw, CbId, CnMsgHdr, CommRaw, CoredumpRaw, ExecRaw, ExitRaw, ForkRaw, IdRaw, NlMsgHdr, ProcEventHdr, PtraceRaw,
	SidRaw, EVENT_HDR_LEN, EVENT_OFFSET, MIN_MESSAGE_LEN, NLMSG_HDR_LEN, TASK_COMM_LEN,
};

/// Frames and decodes one datagram as received from the socket.
pub fn decode_message(datagram: &[u8]) -> Result<ProcEvent> {
	let span = frame_message(datagram)?;
	decode_event(span)
}

/// Validates the envelope and connector headers and returns the event bytes
/// (event header plus payload) they carry.
pub fn frame_message(datagram: &[u8]) -> Result<&[u8]> {
	let declared = NlMsgHdr::read_from_prefix(datagram).map(|(hdr, _)| hdr.len).unwrap_or(0);
	let malformed = || Error::MalformedMessage {
		declared,
		received: datagram.len(),
		min: MIN_MESSAGE_LEN,
	};

	let declared_len = declared as usize;
	if datagram.len() < MIN_MESSAGE_LEN || declared_len < MIN_MESSAGE_LEN || declared_len > datagram.len() {
		return Err(malformed());
	}
	let msg = &datagram[..declared_len];

	let (cn_hdr, _) = CnMsgHdr::read_from_prefix(&msg[NLMSG_HDR_LEN..]).map_err(|_| malformed())?;
	if cn_hdr.id != CbId::PROC {
		return Err(Error::UnexpectedConnector {
			idx: cn_hdr.id.idx,
			val: cn_hdr.id.val,
		});
	}

	let data = &msg[EVENT_OFFSET..];
	let data_len = cn_hdr.len as usize;
	if data_len < EVENT_HDR_LEN || data_len > data.len() {
		return Err(malformed());
	}

	Ok(&data[..data_len])
}

/// Decodes an event header and the payload its type tag selects.
pub fn decode_event(span: &[u8]) -> Result<ProcEvent> {
	// no envelope here, so there is no declared length to report
	let (raw_hdr, payload) = ProcEventHdr::read_from_prefix(span).map_err(|_| Error::MalformedMessage {
		declared: 0,
		received: span.len(),
		min: EVENT_HDR_LEN,
	})?;

	let header = EventHeader {
		event_type: EventType::from_raw(raw_hdr.what),
		cpu: raw_hdr.cpu,
		timestamp_ns: raw_hdr.timestamp_ns,
	};

	let data = decode_payload(header.event_type, payload)?;

	Ok(ProcEvent::new(header, data))
}

fn decode_payload(event_type: EventType, payload: &[u8]) -> Result<EventData> {
	let data = match event_type {
		EventType::None => {
			let raw: AckRaw = read_payload(event_type, payload)?;
			EventData::None(Ack { err: raw.err })
		}
		EventType::Fork => {
			let raw: ForkRaw = read_payload(event_type, payload)?;
			EventData::Fork(Fork {
				parent_pid: raw.parent_pid,
				parent_tgid: raw.parent_tgid,
				child_pid: raw.child_pid,
				child_tgid: raw.child_tgid,
			})
		}
		EventType::Exec => {
			let raw: ExecRaw = read_payload(event_type, payload)?;
			EventData::Exec(Exec {
				process_pid: raw.process_pid,
				process_tgid: raw.process_tgid,
			})
		}
		EventType::Uid => EventData::Uid(id_change(read_payload(event_type, payload)?)),
		EventType::Gid => EventData::Gid(id_change(read_payload(event_type, payload)?)),
		EventType::Sid => {
			let raw: SidRaw = read_payload(event_type, payload)?;
			EventData::Sid(Sid {
				process_pid: raw.process_pid,
				process_tgid: raw.process_tgid,
			})
		}
		EventType::Ptrace => {
			let raw: PtraceRaw = read_payload(event_type, payload)?;
			EventData::Ptrace(Ptrace {
				process_pid: raw.process_pid,
				process_tgid: raw.process_tgid,
				tracer_pid: raw.tracer_pid,
				tracer_tgid: raw.tracer_tgid,
			})
		}
		EventType::Comm => {
			let raw: CommRaw = read_payload(event_type, payload)?;
			EventData::Comm(Comm {
				process_pid: raw.process_pid,
				process_tgid: raw.process_tgid,
				comm: comm_to_string(&raw.comm),
			})
		}
		EventType::Coredump => {
			let raw: CoredumpRaw = read_payload(event_type, payload)?;
			EventData::Coredump(Coredump {
				process_pid: raw.process_pid,
				process_tgid: raw.process_tgid,
				parent_pid: raw.parent_pid,
				parent_tgid: raw.parent_tgid,
			})
		}
		EventType::Exit => {
			let raw: ExitRaw = read_payload(event_type, payload)?;
			EventData::Exit(Exit {
				process_pid: raw.process_pid,
				process_tgid: raw.process_tgid,
				exit_code: raw.exit_code,
				exit_signal: raw.exit_signal,
				parent_pid: raw.parent_pid,
				parent_tgid: raw.parent_tgid,
			})
		}
		EventType::Unknown(_) => EventData::Unknown,
	};

	Ok(data)
}

fn read_payload<T: FromBytes>(event_type: EventType, payload: &[u8]) -> Result<T> {
	T::read_from_prefix(payload)
		.map(|(raw, _)| raw)
		.map_err(|_| Error::TruncatedPayload {
			event_type,
			needed: size_of::<T>(),
			available: payload.len(),
		})
}

fn id_change(raw: IdRaw) -> IdChange {
	IdChange {
		process_pid: raw.process_pid,
		process_tgid: raw.process_tgid,
		real: raw.real,
		effective: raw.effective,
	}
}

fn comm_to_string(comm: &[u8; TASK_COMM_LEN]) -> String {
	let len = comm.iter().position(|&c| c == 0).unwrap_or(TASK_COMM_LEN);
	String::from_utf8_lossy(&comm[..len]).to_string()
}

// region:    --- Tests


// endregion: --- Tests
