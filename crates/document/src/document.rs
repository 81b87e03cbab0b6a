use std::path::{Path, PathBuf};
use std::sync::Arc;

use quill_primitives::rope::{char_to_position, line_content_end, position_to_char};
use quill_primitives::{Bias, Change, CharIdx, DocumentId, EditOrigin, LineSpan, Position, PositionId, Rope, RopeSlice, Transaction};
use tracing::{debug, trace};

use crate::anchor::AnchorArena;
use crate::error::{EditError, PositionError};
use crate::guard::{EditGuard, EditVerdict};

#[cfg(test)]
mod tests;

/// Summary of an applied edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditReport {
	/// Document version after the edit.
	pub version: u64,
	/// Tracked positions whose text was deleted by this edit.
	pub vanished: Vec<PositionId>,
}

/// A text buffer with tracked positions and edit guards.
pub struct Document {
	id: DocumentId,
	text: Rope,
	path: Option<PathBuf>,
	version: u64,
	anchors: AnchorArena,
	guards: Vec<Arc<dyn EditGuard>>,
}

impl std::fmt::Debug for Document {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Document")
			.field("id", &self.id)
			.field("path", &self.path)
			.field("version", &self.version)
			.field("chars", &self.text.len_chars())
			.field("anchors", &self.anchors.len())
			.field("guards", &self.guards.len())
			.finish()
	}
}

impl Document {
	/// Creates a document from its initial contents.
	pub fn new(id: DocumentId, text: &str) -> Self {
		Self {
			id,
			text: Rope::from_str(text),
			path: None,
			version: 0,
			anchors: AnchorArena::default(),
			guards: Vec::new(),
		}
	}

	/// Associates the document with a file path.
	pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.path = Some(path.into());
		self
	}

	pub fn id(&self) -> DocumentId {
		self.id
	}

	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	/// Monotonic revision counter, bumped on every applied edit.
	pub fn version(&self) -> u64 {
		self.version
	}

	pub fn text(&self) -> RopeSlice<'_> {
		self.text.slice(..)
	}

	/// Full contents as a string.
	pub fn contents(&self) -> String {
		self.text.to_string()
	}

	/// Number of lines, including the empty line after a trailing newline.
	pub fn line_count(&self) -> usize {
		self.text.len_lines()
	}

	/// Char index of a position, if it exists in the document.
	pub fn char_at(&self, pos: Position) -> Option<CharIdx> {
		position_to_char(self.text(), pos)
	}

	/// Text between two positions, `end` exclusive.
	pub fn slice_between(&self, start: Position, end: Position) -> Option<String> {
		let start = self.char_at(start)?;
		let end = self.char_at(end)?;
		(start <= end).then(|| self.text.slice(start..end).to_string())
	}

	/// Text of the inclusive line span, without the final line terminator.
	pub fn lines_text(&self, span: LineSpan) -> Option<String> {
		if span.end >= self.line_count() {
			return None;
		}
		let start = self.text.line_to_char(span.start);
		let end = line_content_end(self.text(), span.end);
		Some(self.text.slice(start..end).to_string())
	}

	/// Starts tracking `pos`.
	pub fn create_position(&mut self, pos: Position, bias: Bias) -> Result<PositionId, PositionError> {
		let offset = self.char_at(pos).ok_or(PositionError::OutOfBounds(pos))?;
		Ok(self.anchors.insert(offset, bias))
	}

	/// Current coordinate of a tracked position.
	///
	/// `None` means the position was released or its text was deleted.
	pub fn resolve(&self, id: PositionId) -> Option<Position> {
		self.anchors.offset(id).map(|offset| char_to_position(self.text(), offset))
	}

	/// Current char offset of a tracked position.
	pub fn resolve_char(&self, id: PositionId) -> Option<CharIdx> {
		self.anchors.offset(id)
	}

	/// Stops tracking a position. Returns false if it was already released.
	pub fn release_position(&mut self, id: PositionId) -> bool {
		self.anchors.remove(id)
	}

	pub fn anchors(&self) -> &AnchorArena {
		&self.anchors
	}

	/// Attaches a guard unless one with the same id is already attached.
	///
	/// Returns true if the guard was added.
	pub fn attach_guard(&mut self, guard: Arc<dyn EditGuard>) -> bool {
		if self.guards.iter().any(|g| g.id() == guard.id()) {
			return false;
		}
		debug!(doc = %self.id, guard = guard.id().0, "attached edit guard");
		self.guards.push(guard);
		true
	}

	/// Number of attached guards.
	pub fn guard_count(&self) -> usize {
		self.guards.len()
	}

	/// Asks every guard about every change of `tx` without applying it.
	pub fn check(&self, tx: &Transaction, origin: EditOrigin) -> Result<(), EditError> {
		if !origin.is_guarded() || self.guards.is_empty() {
			return Ok(());
		}
		for span in tx.line_spans(self.text()) {
			for guard in &self.guards {
				if let EditVerdict::Deny { region, job } = guard.check(self, span, origin) {
					debug!(doc = %self.id, %region, %job, start = span.start, end = span.end, "edit denied");
					return Err(EditError::Denied { region, job });
				}
			}
		}
		Ok(())
	}

	/// Checks and applies a transaction built against the current revision.
	///
	/// On error the document, including its tracked positions, is unchanged.
	pub fn apply(&mut self, tx: &Transaction, origin: EditOrigin) -> Result<EditReport, EditError> {
		let actual = self.text.len_chars();
		if tx.changes().len() != actual {
			return Err(EditError::Stale {
				expected: tx.changes().len(),
				actual,
			});
		}
		self.check(tx, origin)?;

		let vanished = self.anchors.map_through(self.text.slice(..), tx);
		tx.apply(&mut self.text);
		self.version += 1;

		if !vanished.is_empty() {
			trace!(doc = %self.id, count = vanished.len(), "tracked positions vanished");
		}
		debug!(doc = %self.id, version = self.version, ?origin, changes = tx.edits().len(), "applied edit");

		Ok(EditReport {
			version: self.version,
			vanished,
		})
	}

	/// Builds and applies a single change.
	pub fn apply_change(&mut self, change: Change, origin: EditOrigin) -> Result<EditReport, EditError> {
		let tx = Transaction::single(self.text(), change)?;
		self.apply(&tx, origin)
	}

	/// Replaces the text between two positions.
	pub fn replace(&mut self, start: Position, end: Position, text: &str, origin: EditOrigin) -> Result<EditReport, EditError> {
		let from = self.char_at(start).ok_or(EditError::OutOfBounds(start))?;
		let to = self.char_at(end).ok_or(EditError::OutOfBounds(end))?;
		self.apply_change(Change::replace(from, to, text), origin)
	}
}
