use derive_more::{Display, From};
use tokio::task::JoinError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
	// -- Externals
	#[from]
	#[display("Watcher error: {_0}")]
	Watcher(lib_proc_connector::Error),
	#[from]
	#[display("{_0}")]
	JoinError(JoinError),
}

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
