//! Error types for launching jobs.

use std::io;

use thiserror::Error;

use crate::ResultSlot;

/// Reasons a job process could not be started.
#[derive(Debug, Error)]
pub enum SpawnError {
	/// The OS refused to start the program.
	#[error("failed to launch `{program}`: {source}")]
	Launch {
		/// Program that was launched.
		program: String,
		/// Underlying I/O error.
		#[source]
		source: io::Error,
	},
	/// The process started but one of its pipes was not captured.
	#[error("failed to capture {stream} of `{program}`")]
	Pipe {
		/// Program that was launched.
		program: String,
		/// Name of the missing stream.
		stream: &'static str,
	},
}

/// A failed spawn hands the result slot back so the caller can release it.
#[derive(Debug)]
pub struct SpawnFailure {
	/// Why the spawn failed.
	pub error: SpawnError,
	/// The slot reserved for the job, still owned by the caller.
	pub slot: ResultSlot,
}
