use std::sync::Arc;

use parking_lot::Mutex;
use quill_document::{Document, EditGuard, EditVerdict};
use quill_primitives::{EditOrigin, GuardId, LineSpan};

use crate::RegionRegistry;

/// Refuses edits that touch the lines of a live region.
///
/// A job's own substitution (`EditOrigin::Job`) is allowed inside its region.
#[derive(Debug, Clone)]
pub struct RegionGuard {
	registry: Arc<Mutex<RegionRegistry>>,
}

impl RegionGuard {
	pub const ID: GuardId = GuardId("region-guard");

	pub fn new(registry: Arc<Mutex<RegionRegistry>>) -> Self {
		Self { registry }
	}
}

impl EditGuard for RegionGuard {
	fn id(&self) -> GuardId {
		Self::ID
	}

	fn check(&self, doc: &Document, span: LineSpan, origin: EditOrigin) -> EditVerdict {
		let registry = self.registry.lock();
		if registry.is_empty() {
			return EditVerdict::Allow;
		}
		registry
			.overlapping(doc, span)
			.find(|region| origin != EditOrigin::Job(region.job))
			.map_or(EditVerdict::Allow, |region| EditVerdict::Deny {
				region: region.id,
				job: region.job,
			})
	}
}
