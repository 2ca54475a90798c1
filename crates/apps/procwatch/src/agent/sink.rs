use futures::StreamExt;
use lib_proc_connector::{EventData, ProcEvent, Rx, WatchResult};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkStats {
	pub events: u64,
	pub errors: u64,
}

/// Logs every watch result until the stream closes or shutdown is requested.
pub async fn run_event_sink(events: Rx<WatchResult>, shutdown: CancellationToken) -> SinkStats {
	let mut stream = events.into_stream();
	let mut stats = SinkStats::default();

	loop {
		tokio::select! {
			_ = shutdown.cancelled() => {
				break;
			}

			res = stream.next() => {
				match res {
					Some(Ok(evt)) => {
						stats.events += 1;
						print_event(&evt);
					}
					Some(Err(err)) => {
						stats.errors += 1;
						if err.is_fatal() {
							error!("{err}");
						} else {
							warn!("{err}");
						}
					}
					None => {
						info!("Event stream closed");
						break;
					}
				}
			}
		}
	}

	stats
}

fn print_event(evt: &ProcEvent) {
	let ty = evt.event_type();
	match evt.data() {
		EventData::Fork(f) => {
			if f.parent_pid == f.parent_tgid && f.child_pid == f.child_tgid {
				info!("[{ty}] {} -> {}", f.parent_pid, f.child_pid);
			} else {
				info!(
					"[{ty}] {} (TGID: {}) -> {} (TGID: {})",
					f.parent_pid, f.parent_tgid, f.child_pid, f.child_tgid
				);
			}
		}
		EventData::Exec(e) => info!("[{ty}] PID: {} TGID: {}", e.process_pid, e.process_tgid),
		EventData::Uid(id) | EventData::Gid(id) => {
			info!(
				"[{ty}] PID: {} real: {} effective: {}",
				id.process_pid, id.real, id.effective
			);
		}
		EventData::Sid(s) => info!("[{ty}] PID: {} (new session)", s.process_pid),
		EventData::Ptrace(p) => {
			if p.tracer_pid == 0 {
				info!("[{ty}] PID: {} detached", p.process_pid);
			} else {
				info!("[{ty}] PID: {} attached by {}", p.process_pid, p.tracer_pid);
			}
		}
		EventData::Comm(c) => info!("[{ty}] PID: {} -> \"{}\"", c.process_pid, c.comm),
		EventData::Coredump(c) => info!("[{ty}] PID: {} (parent {})", c.process_pid, c.parent_pid),
		EventData::Exit(e) => {
			info!(
				"[{ty}] PID: {} TGID: {} code: {} signal: {}",
				e.process_pid, e.process_tgid, e.exit_code, e.exit_signal
			);
		}
		EventData::None(ack) => info!("[{ty}] subscription ack (err {})", ack.err),
		EventData::Unknown => info!("[{ty}] cpu: {}", evt.header().cpu),
	}
}

// region:    --- Tests


// endregion: --- Tests
