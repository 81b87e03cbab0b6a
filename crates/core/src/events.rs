use quill_primitives::{DocumentId, JobId, LineSpan, RegionId};

use crate::JobOutcome;

/// Notifications for the front end, drained with
/// [`Coordinator::drain_events`](crate::Coordinator::drain_events).
#[derive(Debug)]
pub enum CoordinatorEvent {
	RegionCreated {
		document: DocumentId,
		region: RegionId,
		job: JobId,
		span: LineSpan,
	},
	/// An edit moved a live region.
	RegionMoved {
		document: DocumentId,
		region: RegionId,
		span: LineSpan,
	},
	/// An edit deleted the text under a live region. The job keeps running;
	/// its result will be discarded.
	RegionVanished {
		document: DocumentId,
		region: RegionId,
		job: JobId,
	},
	RegionRemoved {
		document: DocumentId,
		region: RegionId,
	},
	/// A user edit was refused because it touches a live region.
	EditDenied {
		document: DocumentId,
		region: RegionId,
		job: JobId,
	},
	JobFinished {
		job: JobId,
		region: RegionId,
		document: Option<DocumentId>,
		outcome: JobOutcome,
	},
	/// The job outlived graceful and forced termination. Its region stays
	/// locked until the process exits.
	TerminationFailed { job: JobId, region: RegionId },
}
