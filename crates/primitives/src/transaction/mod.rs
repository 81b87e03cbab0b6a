//! Text change primitives.
//!
//! A [`Transaction`] is a validated, ordered list of [`Change`]s over one
//! document revision, together with the [`ChangeSet`] used to apply it and to
//! map tracked positions through it.

mod changeset;
mod types;

pub use changeset::ChangeSet;
use thiserror::Error;
pub use types::{Bias, Change};

use crate::RopeSlice;
use crate::range::{CharIdx, LineSpan};

/// Reasons a list of changes cannot form a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeError {
	/// A change starts after it ends.
	#[error("change start {start} is after its end {end}")]
	Inverted {
		/// Start of the offending change.
		start: CharIdx,
		/// End of the offending change.
		end: CharIdx,
	},
	/// A change reaches past the end of the document.
	#[error("change {start}..{end} is out of bounds for a document of {len} chars")]
	OutOfBounds {
		/// Start of the offending change.
		start: CharIdx,
		/// End of the offending change.
		end: CharIdx,
		/// Document length in chars.
		len: usize,
	},
	/// Two changes cover the same text.
	#[error("changes overlap at {at}")]
	Overlapping {
		/// Char index where the overlap begins.
		at: CharIdx,
	},
}

/// An ordered set of non-overlapping changes against one document revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	changes: ChangeSet,
	edits: Vec<Change>,
}

impl Transaction {
	/// Builds a transaction from changes expressed in `doc` coordinates.
	///
	/// Changes are sorted by start position; overlapping or out-of-range
	/// changes are rejected.
	pub fn change(doc: RopeSlice, changes: impl IntoIterator<Item = Change>) -> Result<Self, ChangeError> {
		let len = doc.len_chars();
		let mut edits: Vec<Change> = changes.into_iter().collect();
		edits.sort_by_key(|c| (c.start, c.end));

		let mut set = ChangeSet::default();
		let mut last = 0;
		for change in &edits {
			if change.start > change.end {
				return Err(ChangeError::Inverted {
					start: change.start,
					end: change.end,
				});
			}
			if change.end > len {
				return Err(ChangeError::OutOfBounds {
					start: change.start,
					end: change.end,
					len,
				});
			}
			if change.start < last {
				return Err(ChangeError::Overlapping { at: change.start });
			}

			set.retain(change.start - last);
			set.delete(change.end - change.start);
			if let Some(text) = &change.replacement {
				set.insert(text.clone());
			}
			last = change.end;
		}
		set.retain(len - last);

		Ok(Self { changes: set, edits })
	}

	/// Convenience constructor for a single change.
	pub fn single(doc: RopeSlice, change: Change) -> Result<Self, ChangeError> {
		Self::change(doc, [change])
	}

	/// Returns the underlying changeset.
	pub fn changes(&self) -> &ChangeSet {
		&self.changes
	}

	/// Returns the individual changes in document order.
	pub fn edits(&self) -> &[Change] {
		&self.edits
	}

	/// Returns true if the transaction changes nothing.
	pub fn is_noop(&self) -> bool {
		self.edits
			.iter()
			.all(|c| c.start == c.end && c.replacement.as_deref().is_none_or(str::is_empty))
	}

	/// Line spans touched by each change, in the source document.
	///
	/// A change covers the lines of its first and last removed characters;
	/// a pure insertion covers the line it is inserted on. A removal that
	/// starts mid-line and takes a line terminator also covers the line it
	/// joins onto the first one.
	pub fn line_spans<'a>(&'a self, doc: RopeSlice<'a>) -> impl Iterator<Item = LineSpan> + 'a {
		self.edits.iter().map(move |change| {
			let start_line = doc.char_to_line(change.start);
			let end_line = if change.end == change.start {
				start_line
			} else if change.start > doc.line_to_char(start_line) {
				doc.char_to_line(change.end)
			} else {
				doc.char_to_line(change.end - 1)
			};
			LineSpan::new(start_line, end_line)
		})
	}

	/// Applies the transaction to `doc`.
	pub fn apply(&self, doc: &mut crate::Rope) {
		self.changes.apply(doc);
	}
}
