//! Quill binary.
//!
//! Binds one job to a region of a file, waits for it while logging region
//! events, and writes the file back once the job's output has been
//! substituted. Ctrl-C aborts the job.

mod cli;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use quill_config::{Config, LogConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();
	let config = Config::resolve(cli.config.as_deref())?;

	setup_tracing(&config.log, cli.verbose);

	run::run(cli, config).await
}

fn setup_tracing(log: &LogConfig, verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::fmt::format::FmtSpan;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("quill=trace,quill_core=debug,quill_jobs=debug,info")
			} else {
				EnvFilter::new(&log.level)
			}
		})
	};

	// QUILL_LOG_DIR takes precedence over the configured file
	let log_path = std::env::var("QUILL_LOG_DIR")
		.ok()
		.map(PathBuf::from)
		.filter(|dir| std::fs::create_dir_all(dir).is_ok())
		.map(|dir| dir.join(format!("quill.{}.log", std::process::id())))
		.or_else(|| log.file.clone());

	if let Some(log_path) = log_path
		&& let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path)
	{
		let file_layer = tracing_subscriber::fmt::layer()
			.with_writer(file)
			.with_ansi(false)
			.with_span_events(FmtSpan::CLOSE)
			.with_target(true);

		tracing_subscriber::registry().with(filter()).with(file_layer).init();

		tracing::info!(path = ?log_path, "tracing initialized");
		return;
	}

	// Stdout may carry the rewritten file
	tracing_subscriber::fmt()
		.with_env_filter(filter())
		.with_writer(std::io::stderr)
		.init();
}
