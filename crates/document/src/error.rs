//! Error types for document edits and tracked positions.

use quill_primitives::{ChangeError, DocumentId, JobId, Position, RegionId};
use thiserror::Error;

/// Reasons an edit was not applied. The document is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
	/// A guard refused the edit because it touches a locked region.
	#[error("cannot edit: {region} is locked by {job}")]
	Denied {
		/// Region the edit overlaps.
		region: RegionId,
		/// Job holding the region.
		job: JobId,
	},
	/// The changes themselves are malformed for this document.
	#[error(transparent)]
	Change(#[from] ChangeError),
	/// The transaction was built against a different revision.
	#[error("transaction expects {expected} chars, document has {actual}")]
	Stale {
		/// Source length the transaction was built for.
		expected: usize,
		/// Current document length.
		actual: usize,
	},
	/// A coordinate given by the caller does not exist in the document.
	#[error("position {0:?} is outside the document")]
	OutOfBounds(Position),
	/// No open document has this id.
	#[error("unknown document {0}")]
	UnknownDocument(DocumentId),
}

/// Errors creating tracked positions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
	/// The requested coordinate is outside the document.
	#[error("position {0:?} is outside the document")]
	OutOfBounds(Position),
}
