//! Edit interception.

use quill_primitives::{EditOrigin, GuardId, JobId, LineSpan, RegionId};

use crate::Document;

/// Answer of a guard for one pending edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditVerdict {
	/// The edit may proceed.
	Allow,
	/// The edit touches a locked region and must not be applied.
	Deny {
		/// Region the edit overlaps.
		region: RegionId,
		/// Job holding the region.
		job: JobId,
	},
}

/// Consulted before every guarded edit is applied to a document.
///
/// Guards see the document as it is before the edit and the inclusive line
/// span the edit touches. They must not assume they are called only when
/// something is locked: an idle guard is asked about every edit.
pub trait EditGuard: Send + Sync {
	/// Stable identity; a document holds at most one guard per id.
	fn id(&self) -> GuardId;

	/// Decides whether an edit touching `span` may be applied.
	fn check(&self, doc: &Document, span: LineSpan, origin: EditOrigin) -> EditVerdict;
}
