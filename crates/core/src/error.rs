//! Caller-visible failures of job requests and job outcomes.

use std::{fmt, io};

use quill_document::EditError;
use quill_jobs::SpawnError;
use quill_primitives::{DocumentId, JobId, RegionId};
use thiserror::Error;

use crate::OverlapError;

/// Why a job could not be started. No region, slot or process is left behind.
#[derive(Debug, Error)]
pub enum StartError {
	/// The selection intersects a live region; nothing changed.
	#[error("selection overlaps {region} held by {job}")]
	Overlap { region: RegionId, job: JobId },
	/// The job process could not be launched; its region and slot were released.
	#[error(transparent)]
	Spawn(#[from] SpawnError),
	#[error("unknown document {0}")]
	UnknownDocument(DocumentId),
	/// The selection does not describe a span of the document.
	#[error("invalid selection: {0}")]
	InvalidSelection(&'static str),
	/// No result slot could be reserved.
	#[error("failed to reserve a result slot: {0}")]
	Store(#[source] io::Error),
}

impl From<OverlapError> for StartError {
	fn from(err: OverlapError) -> Self {
		Self::Overlap {
			region: err.region,
			job: err.job,
		}
	}
}

/// What happened to a finished job's region.
#[derive(Debug)]
pub enum JobOutcome {
	/// The artifact replaced the region.
	Completed {
		/// Lines substituted.
		lines: usize,
	},
	/// Cancelled; the region was released untouched.
	Aborted,
	/// The process failed; the region was released untouched.
	Crashed { reason: String },
	/// The region's text was deleted while the job ran; nothing was substituted.
	Vanished,
	/// The job succeeded but its artifact could not be read.
	ArtifactUnreadable { error: io::Error },
	/// The substitution edit itself was refused.
	EditRejected { error: EditError },
}

impl JobOutcome {
	/// Returns true if the document was modified.
	pub fn substituted(&self) -> bool {
		matches!(self, Self::Completed { .. })
	}
}

impl fmt::Display for JobOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Completed { lines } => write!(f, "substituted {lines} line(s)"),
			Self::Aborted => f.write_str("aborted"),
			Self::Crashed { reason } => write!(f, "job failed: {reason}"),
			Self::Vanished => f.write_str("region was deleted while the job ran"),
			Self::ArtifactUnreadable { error } => write!(f, "could not read job output: {error}"),
			Self::EditRejected { error } => write!(f, "substitution refused: {error}"),
		}
	}
}
