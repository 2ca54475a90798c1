// region:    --- Modules
mod agent;
mod cli;
mod error;
// endregion: --- Modules

use std::{sync::Arc, time::Duration};

pub use self::error::{Error, Result};
use agent::run_event_sink;
use clap::Parser;
use cli::args::Cli;
use lib_proc_connector::{Watcher, WatcherConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
	let args = Cli::parse();
	tracing_subscriber::fmt()
		.with_target(false)
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	let config = WatcherConfig::default().with_recv_buffer_size(args.buffer_size);
	let watcher = Arc::new(Watcher::with_config(config));

	// needs CAP_NET_ADMIN
	watcher.start()?;
	info!("->> WATCHING PROCESS EVENTS");

	let shutdown = CancellationToken::new();
	install_shutdown_triggers(shutdown.clone(), args.time.map(Duration::from));

	let stats = run_event_sink(watcher.events(), shutdown).await;

	tokio::task::spawn_blocking(move || watcher.stop()).await?;
	info!("Exiting... ({} events, {} errors)", stats.events, stats.errors);

	Ok(())
}

fn install_shutdown_triggers(shutdown: CancellationToken, run_time: Option<Duration>) {
	let ctrl_c_token = shutdown.clone();
	tokio::spawn(async move {
		if signal::ctrl_c().await.is_ok() {
			info!("Received Ctrl+C, shutting down...");
		}
		ctrl_c_token.cancel();
	});

	if let Some(run_time) = run_time {
		tokio::spawn(async move {
			tokio::time::sleep(run_time).await;
			shutdown.cancel();
		});
	}
}
