use clap::Parser;
use humantime::Duration;
use lib_proc_connector::DEFAULT_RECV_BUFFER_SIZE;

#[derive(Parser, Debug)]
#[command(name = "procwatch", about = "Logs Linux process events from the kernel proc connector")]
pub struct Cli {
	#[arg(long, default_value_t = DEFAULT_RECV_BUFFER_SIZE, help = "Receive buffer size in bytes (min 1024)")]
	pub buffer_size: usize,

	#[arg(long, help = "Stop after this duration (e.g., 20s, 5m, 1h). Runs until Ctrl+C when omitted")]
	pub time: Option<Duration>,
}

// region:    --- Tests


// endregion: --- Tests
