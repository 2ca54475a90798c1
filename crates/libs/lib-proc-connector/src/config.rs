/// Smallest accepted receive buffer; anything below would truncate kernel messages.
pub const MIN_RECV_BUFFER_SIZE: usize = 1024;
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 4096;

const DEFAULT_THREAD_NAME: &str = "proc-connector-recv";

#[derive(Debug, Clone)]
pub struct WatcherConfig {
	recv_buffer_size: usize,
	thread_name: String,
}

impl Default for WatcherConfig {
	fn default() -> Self {
		Self {
			recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
			thread_name: DEFAULT_THREAD_NAME.to_string(),
		}
	}
}

impl WatcherConfig {
	/// Sets the receive buffer size, raised to [`MIN_RECV_BUFFER_SIZE`] if smaller.
	pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
		self.recv_buffer_size = size.max(MIN_RECV_BUFFER_SIZE);
		self
	}

	pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
		self.thread_name = name.into();
		self
	}

	pub fn recv_buffer_size(&self) -> usize {
		self.recv_buffer_size
	}

	pub fn thread_name(&self) -> &str {
		&self.thread_name
	}
}

// region:    --- Tests


// endregion: --- Tests
