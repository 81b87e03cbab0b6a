//! Settling finished jobs.
//!
//! A finished job arrives here exactly once, already removed from the
//! supervisor's live set. Its region is taken out of the registry before
//! anything else happens, so whichever path observes the job first owns the
//! cleanup and any later attempt finds nothing to release.

use parking_lot::Mutex;
use quill_document::{Document, DocumentStore, EditError};
use quill_jobs::{FinishedJob, JobExit, ResultSlot, ResultStore};
use quill_primitives::rope::{line_content_end, line_end_with_terminator, line_start};
use quill_primitives::{Change, DocumentId, EditOrigin, JobId, RegionId};
use tracing::{debug, info, warn};

use crate::JobOutcome;
use crate::registry::{Region, RegionRegistry, SelectionMode, fingerprint};


/// Splits an artifact into replacement lines.
///
/// Lines end at `\n` with a trailing `\r` stripped. A final terminator does not
/// start another line, and an empty artifact has no lines at all.
pub fn artifact_lines(artifact: &str) -> Vec<&str> {
	if artifact.is_empty() {
		return Vec::new();
	}
	let mut lines: Vec<&str> = artifact.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line)).collect();
	if artifact.ends_with('\n') {
		lines.pop();
	}
	lines
}

/// What became of one finished job.
#[derive(Debug)]
pub struct CompletionReport {
	pub job: JobId,
	pub region: RegionId,
	/// Document the region belonged to, if the region was still registered.
	pub document: Option<DocumentId>,
	pub outcome: JobOutcome,
}

/// Releases a finished job's region, anchors and slot, substituting its
/// artifact first when the job completed.
pub struct CompletionHandler<'a> {
	documents: &'a mut DocumentStore,
	registry: &'a Mutex<RegionRegistry>,
	store: &'a mut ResultStore,
}

impl<'a> CompletionHandler<'a> {
	pub fn new(documents: &'a mut DocumentStore, registry: &'a Mutex<RegionRegistry>, store: &'a mut ResultStore) -> Self {
		Self {
			documents,
			registry,
			store,
		}
	}

	pub fn handle(&mut self, finished: FinishedJob) -> CompletionReport {
		let FinishedJob {
			id,
			region,
			slot,
			exit,
			stderr_tail,
			..
		} = finished;

		let released = self.registry.lock().release(region);
		let outcome = match &released {
			Some(owned) => self.settle(owned, &slot, exit, &stderr_tail),
			None => {
				debug!(job = %id, %region, "region already released");
				orphaned(exit)
			}
		};

		if let Some(owned) = &released
			&& let Some(doc) = self.documents.get_mut(owned.document)
		{
			doc.release_position(owned.start);
			doc.release_position(owned.end);
		}
		if let Err(e) = self.store.release(slot) {
			warn!(job = %id, error = %e, "failed to release result slot");
		}

		CompletionReport {
			job: id,
			region,
			document: released.map(|r| r.document),
			outcome,
		}
	}

	fn settle(&mut self, region: &Region, slot: &ResultSlot, exit: JobExit, stderr: &[String]) -> JobOutcome {
		let Some(doc) = self.documents.get_mut(region.document) else {
			debug!(job = %region.job, doc = %region.document, "document closed before job finished");
			return orphaned(exit);
		};
		match exit {
			JobExit::Aborted => {
				info!(job = %region.job, region = %region.id, "job aborted, region released");
				JobOutcome::Aborted
			}
			JobExit::Crashed { reason } => {
				warn!(job = %region.job, region = %region.id, %reason, ?stderr, "job crashed, region released");
				JobOutcome::Crashed { reason }
			}
			JobExit::Completed => substitute(doc, self.store, region, slot),
		}
	}
}

fn orphaned(exit: JobExit) -> JobOutcome {
	match exit {
		JobExit::Completed => JobOutcome::Vanished,
		JobExit::Aborted => JobOutcome::Aborted,
		JobExit::Crashed { reason } => JobOutcome::Crashed { reason },
	}
}

/// Replaces the region, at wherever it is now, with the job's artifact.
fn substitute(doc: &mut Document, store: &ResultStore, region: &Region, slot: &ResultSlot) -> JobOutcome {
	let resolved = doc.resolve(region.start).zip(doc.resolve(region.end));
	let Some((start, end)) = resolved.filter(|(start, end)| start <= end) else {
		warn!(job = %region.job, region = %region.id, "region vanished, skipping substitution");
		return JobOutcome::Vanished;
	};

	if doc.slice_between(start, end).map(|text| fingerprint(&text)) != Some(region.fingerprint) {
		warn!(job = %region.job, region = %region.id, "region text changed while the job ran");
	}

	let bytes = match store.read(slot) {
		Ok(bytes) => bytes,
		Err(error) => {
			warn!(job = %region.job, path = %slot.path().display(), %error, "failed to read job artifact");
			return JobOutcome::ArtifactUnreadable { error };
		}
	};
	let artifact = String::from_utf8_lossy(&bytes);
	let lines = artifact_lines(&artifact);

	let text = doc.text();
	// Used when the preferred change reaches a line another job holds.
	let mut fallback = None;
	let change = match region.mode {
		SelectionMode::Line if lines.is_empty() => {
			let from = line_start(text, start.line);
			let to = line_end_with_terminator(text, end.line);
			// Unterminated last line: take the preceding terminator instead.
			if start.line > 0 && line_content_end(text, end.line) == to {
				fallback = Some(Change::delete(from, to));
				Change::delete(line_content_end(text, start.line - 1), to)
			} else {
				Change::delete(from, to)
			}
		}
		SelectionMode::Line => Change::replace(line_start(text, start.line), line_content_end(text, end.line), lines.join("\n")),
		SelectionMode::Char | SelectionMode::Block => {
			let (Some(from), Some(to)) = (doc.resolve_char(region.start), doc.resolve_char(region.end)) else {
				return JobOutcome::Vanished;
			};
			Change::replace(from, to, lines.join("\n"))
		}
	};

	let mut applied = doc.apply_change(change, EditOrigin::Job(region.job));
	if matches!(applied, Err(EditError::Denied { .. }))
		&& let Some(fallback) = fallback
	{
		debug!(job = %region.job, region = %region.id, "preceding line is locked, keeping its terminator");
		applied = doc.apply_change(fallback, EditOrigin::Job(region.job));
	}

	match applied {
		Ok(report) => {
			info!(
				job = %region.job,
				region = %region.id,
				lines = lines.len(),
				version = report.version,
				"substituted job result"
			);
			JobOutcome::Completed { lines: lines.len() }
		}
		Err(error) => {
			warn!(job = %region.job, region = %region.id, %error, "substitution edit refused");
			JobOutcome::EditRejected { error }
		}
	}
}
