//! Caller-facing entry point.
//!
//! One [`Coordinator`] per host. It owns the documents, the job supervisor and
//! the result store, and shares the region registry with the guard attached to
//! every document it opens. Nothing here blocks: the host calls
//! [`Coordinator::pump`] on a fixed interval and everything else is a plain
//! synchronous call on `&mut self`.

use std::io;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use quill_document::{Document, DocumentStore, EditError, EditGuard, EditReport};
use quill_jobs::{
	FinishedJob, JobCommand, JobInfo, JobState, JobSupervisor, ResultSlot, ResultStore, SpawnFailure, SupervisorConfig, SupervisorEvent,
	TerminateRequest,
};
use quill_primitives::rope::{line_content_end, line_start};
use quill_primitives::{Bias, Change, DocumentId, EditOrigin, JobId, LineSpan, Position};
use tracing::{debug, error, info, warn};

use crate::registry::{NewRegion, Region, RegionRegistry, SelectionMode, fingerprint};
use crate::{CompletionHandler, CoordinatorEvent, PromptBuilder, PromptContext, RegionGuard, StartError};


/// Construction parameters for a [`Coordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
	/// Command run for every job.
	pub command: JobCommand,
	pub supervisor: SupervisorConfig,
	/// Artifact directory. A private temporary directory when unset.
	pub results_dir: Option<PathBuf>,
}

impl CoordinatorConfig {
	pub fn new(command: JobCommand) -> Self {
		Self {
			command,
			supervisor: SupervisorConfig::default(),
			results_dir: None,
		}
	}
}

/// A span of a document to hand to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRequest {
	pub start: Position,
	/// Exclusive end. In line mode only its line matters.
	pub end: Position,
	pub mode: SelectionMode,
}

impl SelectionRequest {
	/// Whole lines `first..=last`.
	pub fn lines(first: usize, last: usize) -> Self {
		Self {
			start: Position::line_start(first),
			end: Position::line_start(last),
			mode: SelectionMode::Line,
		}
	}

	/// The exact chars between two positions.
	pub fn chars(start: Position, end: Position) -> Self {
		Self {
			start,
			end,
			mode: SelectionMode::Char,
		}
	}
}

/// Answer to an abort request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortOutcome {
	/// Termination of this job is under way; its region is released on the
	/// tick that observes the exit.
	Aborting(JobId),
	/// No live job owns that location.
	NothingToAbort,
}

/// Owns documents, regions and jobs for one host.
#[derive(Debug)]
pub struct Coordinator {
	documents: DocumentStore,
	registry: Arc<Mutex<RegionRegistry>>,
	guard: Arc<RegionGuard>,
	supervisor: JobSupervisor,
	store: ResultStore,
	command: JobCommand,
	events: Vec<CoordinatorEvent>,
}

impl Coordinator {
	pub fn new(config: CoordinatorConfig) -> io::Result<Self> {
		let store = match config.results_dir {
			Some(dir) => ResultStore::in_dir(dir)?,
			None => ResultStore::temporary()?,
		};
		let registry = Arc::new(Mutex::new(RegionRegistry::new()));
		info!(results = %store.dir().display(), program = %config.command.program, "coordinator ready");
		Ok(Self {
			documents: DocumentStore::new(),
			guard: Arc::new(RegionGuard::new(Arc::clone(&registry))),
			registry,
			supervisor: JobSupervisor::new(config.supervisor),
			store,
			command: config.command,
			events: Vec::new(),
		})
	}

	/// Opens a document with the region guard attached.
	pub fn open_document(&mut self, text: &str, path: Option<PathBuf>) -> DocumentId {
		let id = self.documents.open(text, path);
		if let Some(doc) = self.documents.get_mut(id) {
			let guard: Arc<dyn EditGuard> = self.guard.clone();
			doc.attach_guard(guard);
		}
		id
	}

	/// Closes a document, aborting every job that holds one of its regions.
	pub fn close_document(&mut self, doc: DocumentId) -> Option<Document> {
		let document = self.documents.close(doc)?;
		let released: Vec<Region> = {
			let mut registry = self.registry.lock();
			let ids: Vec<_> = registry.regions_in(doc).map(|r| r.id).collect();
			ids.into_iter().filter_map(|id| registry.release(id)).collect()
		};
		for region in released {
			info!(%doc, job = %region.job, region = %region.id, "document closed, aborting job");
			self.supervisor.terminate(region.job);
			self.events.push(CoordinatorEvent::RegionRemoved {
				document: doc,
				region: region.id,
			});
		}
		Some(document)
	}

	pub fn document(&self, doc: DocumentId) -> Option<&Document> {
		self.documents.get(doc)
	}

	/// Live regions of a document with their current spans.
	pub fn regions(&self, doc: DocumentId) -> Vec<(Region, Option<LineSpan>)> {
		self.documents
			.get(doc)
			.map(|document| self.registry.lock().spans_in(document))
			.unwrap_or_default()
	}

	pub fn results(&self) -> &ResultStore {
		&self.store
	}

	/// Applies an interactive edit. Refused if it touches a live region.
	pub fn apply_edit(&mut self, doc: DocumentId, change: Change) -> Result<EditReport, EditError> {
		self.edit(doc, change, EditOrigin::User)
	}

	/// Applies an edit that guards cannot refuse, such as a reload from disk.
	pub fn apply_external_edit(&mut self, doc: DocumentId, change: Change) -> Result<EditReport, EditError> {
		self.edit(doc, change, EditOrigin::External)
	}

	fn edit(&mut self, doc: DocumentId, change: Change, origin: EditOrigin) -> Result<EditReport, EditError> {
		let document = self.documents.get_mut(doc).ok_or(EditError::UnknownDocument(doc))?;
		let before = self.registry.lock().spans_in(document);
		match document.apply_change(change, origin) {
			Ok(report) => {
				let after = self.registry.lock().spans_in(document);
				push_region_changes(&mut self.events, doc, &before, after);
				Ok(report)
			}
			Err(err) => {
				if let EditError::Denied { region, job } = err {
					self.events.push(CoordinatorEvent::EditDenied {
						document: doc,
						region,
						job,
					});
				}
				Err(err)
			}
		}
	}

	/// Starts a job over the selection.
	///
	/// Fails without side effects if the selection overlaps a live region. A
	/// launch failure releases the region and slot before returning.
	pub fn start_job(&mut self, doc: DocumentId, request: SelectionRequest, prompt: &dyn PromptBuilder) -> Result<JobId, StartError> {
		let document = self.documents.get_mut(doc).ok_or(StartError::UnknownDocument(doc))?;
		let (start, end) = resolve_selection(document, request)?;
		let span = LineSpan::new(start.line, end.line);

		if let Some(existing) = self.registry.lock().overlapping(document, span).next() {
			debug!(%doc, region = %existing.id, job = %existing.job, "selection overlaps live region");
			return Err(StartError::Overlap {
				region: existing.id,
				job: existing.job,
			});
		}

		let selection = document.slice_between(start, end).unwrap_or_default();
		let job = self.supervisor.reserve_id();
		let slot = self.store.allocate(job).map_err(StartError::Store)?;

		let (start_pos, end_pos) = match (document.create_position(start, Bias::Right), document.create_position(end, Bias::Left)) {
			(Ok(s), Ok(e)) => (s, e),
			(s, e) => {
				for id in [s, e].into_iter().flatten() {
					document.release_position(id);
				}
				discard_slot(&mut self.store, slot);
				return Err(StartError::InvalidSelection("position outside the document"));
			}
		};

		let new = NewRegion {
			document: doc,
			start: start_pos,
			end: end_pos,
			mode: request.mode,
			fingerprint: fingerprint(&selection),
			job,
		};
		let registered = self.registry.lock().register(document, span, new);
		let region = match registered {
			Ok(region) => region,
			Err(err) => {
				document.release_position(start_pos);
				document.release_position(end_pos);
				discard_slot(&mut self.store, slot);
				return Err(err.into());
			}
		};

		let prompt = prompt.build(&PromptContext {
			selection: &selection,
			mode: request.mode,
			output_path: slot.path(),
			document_path: document.path(),
		});

		match self.supervisor.spawn(job, region, &self.command, prompt.into_bytes(), slot) {
			Ok(job) => {
				self.events.push(CoordinatorEvent::RegionCreated {
					document: doc,
					region,
					job,
					span,
				});
				Ok(job)
			}
			Err(SpawnFailure { error, slot }) => {
				warn!(%doc, %job, %error, "job failed to start, releasing region");
				self.registry.lock().release(region);
				document.release_position(start_pos);
				document.release_position(end_pos);
				discard_slot(&mut self.store, slot);
				Err(StartError::Spawn(error))
			}
		}
	}

	/// Cancels the job whose region contains `line`.
	pub fn abort(&mut self, doc: DocumentId, line: usize) -> AbortOutcome {
		match self.job_at(doc, line) {
			Some(job) => self.abort_job(job),
			None => AbortOutcome::NothingToAbort,
		}
	}

	/// Cancels a job by id.
	pub fn abort_job(&mut self, job: JobId) -> AbortOutcome {
		match self.supervisor.terminate(job) {
			TerminateRequest::Signalled | TerminateRequest::AlreadyTerminating => AbortOutcome::Aborting(job),
			TerminateRequest::AlreadyGone => AbortOutcome::NothingToAbort,
		}
	}

	/// The live job whose region contains `line`.
	pub fn query_job_at(&self, doc: DocumentId, line: usize) -> Option<JobInfo> {
		self.job_at(doc, line).and_then(|job| self.supervisor.info(job))
	}

	fn job_at(&self, doc: DocumentId, line: usize) -> Option<JobId> {
		let document = self.documents.get(doc)?;
		let registry = self.registry.lock();
		let region = registry.find_containing(document, line)?;
		registry.get(region).map(|r| r.job)
	}

	/// Snapshot of every live job, oldest first.
	pub fn active_jobs(&self) -> Vec<JobInfo> {
		let mut ids: Vec<JobId> = self.supervisor.ids().collect();
		ids.sort();
		ids.into_iter().filter_map(|id| self.supervisor.info(id)).collect()
	}

	/// One tick: observes exited jobs and settles them. Returns how many jobs
	/// finished.
	pub fn pump(&mut self) -> usize {
		let mut finished = 0;
		for event in self.supervisor.poll() {
			match event {
				SupervisorEvent::Finished(job) => {
					finished += 1;
					self.settle(job);
				}
				SupervisorEvent::TerminationFailed { id, region } => {
					error!(job = %id, %region, "job could not be terminated, region stays locked");
					self.events.push(CoordinatorEvent::TerminationFailed { job: id, region });
				}
			}
		}
		finished
	}

	/// Pumps on the configured interval until no job that can still exit is
	/// left. Stuck jobs do not keep this waiting.
	pub async fn run_until_idle(&mut self) {
		let interval = self.poll_interval();
		loop {
			self.pump();
			let waiting = self
				.supervisor
				.ids()
				.any(|id| self.supervisor.state(id).is_some_and(|state| state != JobState::Stuck));
			if !waiting {
				break;
			}
			tokio::time::sleep(interval).await;
		}
	}

	/// Interval the host should call [`Self::pump`] on.
	pub fn poll_interval(&self) -> Duration {
		self.supervisor.config().poll_interval
	}

	/// Takes the events produced since the last call.
	pub fn drain_events(&mut self) -> Vec<CoordinatorEvent> {
		mem::take(&mut self.events)
	}

	/// Kills every live job and releases its region and slot.
	pub fn shutdown(&mut self) {
		let jobs = self.supervisor.shutdown();
		if !jobs.is_empty() {
			info!(count = jobs.len(), "shutting down live jobs");
		}
		for job in jobs {
			self.settle(job);
		}
	}

	fn settle(&mut self, job: FinishedJob) {
		let document = self.registry.lock().get(job.region).map(|r| r.document);
		let before = document
			.and_then(|doc| self.documents.get(doc))
			.map(|doc| self.registry.lock().spans_in(doc))
			.unwrap_or_default();

		let report = CompletionHandler::new(&mut self.documents, &self.registry, &mut self.store).handle(job);

		if let Some(document) = report.document {
			self.events.push(CoordinatorEvent::RegionRemoved {
				document,
				region: report.region,
			});
			if report.outcome.substituted()
				&& let Some(doc) = self.documents.get(document)
			{
				let after = self.registry.lock().spans_in(doc);
				push_region_changes(&mut self.events, document, &before, after);
			}
		}
		self.events.push(CoordinatorEvent::JobFinished {
			job: report.job,
			region: report.region,
			document: report.document,
			outcome: report.outcome,
		});
	}
}

/// Normalises a request to the exact span a region will cover.
fn resolve_selection(doc: &Document, request: SelectionRequest) -> Result<(Position, Position), StartError> {
	let SelectionRequest { start, end, mode } = request;
	if end < start {
		return Err(StartError::InvalidSelection("selection ends before it starts"));
	}
	match mode {
		SelectionMode::Line => {
			if end.line >= doc.line_count() {
				return Err(StartError::InvalidSelection("line past the end of the document"));
			}
			let text = doc.text();
			let end_col = line_content_end(text, end.line) - line_start(text, end.line);
			Ok((Position::line_start(start.line), Position::new(end.line, end_col)))
		}
		SelectionMode::Char | SelectionMode::Block => {
			if doc.char_at(start).is_none() || doc.char_at(end).is_none() {
				return Err(StartError::InvalidSelection("position outside the document"));
			}
			if start == end {
				return Err(StartError::InvalidSelection("empty selection"));
			}
			Ok((start, end))
		}
	}
}

fn push_region_changes(
	events: &mut Vec<CoordinatorEvent>,
	document: DocumentId,
	before: &[(Region, Option<LineSpan>)],
	after: Vec<(Region, Option<LineSpan>)>,
) {
	for (region, span) in after {
		let old = before.iter().find(|(r, _)| r.id == region.id).and_then(|(_, s)| *s);
		match (old, span) {
			(Some(old), Some(span)) if old != span => events.push(CoordinatorEvent::RegionMoved {
				document,
				region: region.id,
				span,
			}),
			(Some(_), None) => {
				warn!(%document, region = %region.id, job = %region.job, "region vanished under a running job");
				events.push(CoordinatorEvent::RegionVanished {
					document,
					region: region.id,
					job: region.job,
				});
			}
			_ => {}
		}
	}
}

fn discard_slot(store: &mut ResultStore, slot: ResultSlot) {
	let job = slot.job();
	if let Err(e) = store.release(slot) {
		warn!(%job, error = %e, "failed to release result slot");
	}
}
