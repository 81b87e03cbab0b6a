//! Live regions, keyed by id and grouped by document.
//!
//! A region never stores coordinates: its boundaries are two tracked
//! positions in its document, so every span the registry reports is resolved
//! against the document as it is now. Overlap is decided on whole lines.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use quill_document::Document;
use quill_primitives::{DocumentId, JobId, LineSpan, PositionId, RegionId};
use rustc_hash::FxHasher;
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
mod tests;

/// How a region's boundaries are interpreted on substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectionMode {
	/// Exact start and end coordinates.
	Char,
	/// Whole lines from the start line to the end line, inclusive.
	#[default]
	Line,
	/// Rectangular selection; substituted over its exact coordinates.
	Block,
}

/// A document span owned by exactly one in-flight job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
	pub id: RegionId,
	pub document: DocumentId,
	/// Right-biased anchor at the first selected char.
	pub start: PositionId,
	/// Left-biased anchor just past the last selected char.
	pub end: PositionId,
	pub mode: SelectionMode,
	/// Hash of the selected text when the job started.
	pub fingerprint: u64,
	pub job: JobId,
}

/// Everything needed to register a region except its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewRegion {
	pub document: DocumentId,
	pub start: PositionId,
	pub end: PositionId,
	pub mode: SelectionMode,
	pub fingerprint: u64,
	pub job: JobId,
}

/// A requested span intersects a live region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("selection overlaps {region} held by {job}")]
pub struct OverlapError {
	pub region: RegionId,
	pub job: JobId,
}

/// Hash of a region's text, used to notice that it changed while the job ran.
pub fn fingerprint(text: &str) -> u64 {
	let mut hasher = FxHasher::default();
	text.hash(&mut hasher);
	hasher.finish()
}

/// Current line span of `region` in `doc`.
///
/// `None` when either anchor vanished or the anchors crossed, which callers
/// treat as the region having vanished.
pub fn region_span(doc: &Document, region: &Region) -> Option<LineSpan> {
	let start = doc.resolve(region.start)?;
	let end = doc.resolve(region.end)?;
	(start <= end).then(|| LineSpan::new(start.line, end.line))
}

/// Every live region of every document.
#[derive(Debug, Default)]
pub struct RegionRegistry {
	regions: BTreeMap<RegionId, Region>,
	next_id: u64,
}

impl RegionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.regions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.regions.is_empty()
	}

	pub fn get(&self, id: RegionId) -> Option<&Region> {
		self.regions.get(&id)
	}

	/// Live regions of one document, in creation order.
	pub fn regions_in(&self, doc: DocumentId) -> impl Iterator<Item = &Region> + '_ {
		self.regions.values().filter(move |r| r.document == doc)
	}

	/// Current span of a region, if it belongs to `doc` and still resolves.
	pub fn span(&self, doc: &Document, id: RegionId) -> Option<LineSpan> {
		self.regions
			.get(&id)
			.filter(|r| r.document == doc.id())
			.and_then(|r| region_span(doc, r))
	}

	/// Regions of `doc` with their current spans; vanished regions map to `None`.
	pub fn spans_in(&self, doc: &Document) -> Vec<(Region, Option<LineSpan>)> {
		self.regions_in(doc.id()).map(|r| (*r, region_span(doc, r))).collect()
	}

	/// Regions of `doc` whose current span intersects `span`.
	pub fn overlapping<'a>(&'a self, doc: &'a Document, span: LineSpan) -> impl Iterator<Item = &'a Region> + 'a {
		self.regions_in(doc.id())
			.filter(move |r| region_span(doc, r).is_some_and(|s| s.intersects(&span)))
	}

	pub fn find_overlapping(&self, doc: &Document, span: LineSpan) -> Option<RegionId> {
		self.overlapping(doc, span).next().map(|r| r.id)
	}

	pub fn find_containing(&self, doc: &Document, line: usize) -> Option<RegionId> {
		self.find_overlapping(doc, LineSpan::single(line))
	}

	/// Registers a region covering `span`, unless a live region of the same
	/// document already intersects it.
	///
	/// Check and insert happen under the same borrow, so two overlapping
	/// regions can never both be registered.
	pub fn register(&mut self, doc: &Document, span: LineSpan, new: NewRegion) -> Result<RegionId, OverlapError> {
		if let Some(existing) = self.overlapping(doc, span).next() {
			return Err(OverlapError {
				region: existing.id,
				job: existing.job,
			});
		}
		self.next_id += 1;
		let id = RegionId(self.next_id);
		self.regions.insert(
			id,
			Region {
				id,
				document: new.document,
				start: new.start,
				end: new.end,
				mode: new.mode,
				fingerprint: new.fingerprint,
				job: new.job,
			},
		);
		debug!(region = %id, doc = %new.document, job = %new.job, start = span.start, end = span.end, "registered region");
		Ok(id)
	}

	/// Removes a region. Returns `None` if it was already released.
	pub fn release(&mut self, id: RegionId) -> Option<Region> {
		let region = self.regions.remove(&id)?;
		debug!(region = %id, job = %region.job, "released region");
		Some(region)
	}
}
