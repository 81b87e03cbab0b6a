use crate::range::{CharIdx, CharLen};

/// Replace the chars `start..end` with `replacement`; `None` deletes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
	pub start: CharIdx,
	pub end: CharIdx,
	pub replacement: Option<String>,
}

impl Change {
	/// Inserts `text` at `at`.
	pub fn insert(at: CharIdx, text: impl Into<String>) -> Self {
		Self {
			start: at,
			end: at,
			replacement: Some(text.into()),
		}
	}

	/// Deletes `[start, end)`.
	pub fn delete(start: CharIdx, end: CharIdx) -> Self {
		Self {
			start,
			end,
			replacement: None,
		}
	}

	/// Replaces `[start, end)` with `text`.
	pub fn replace(start: CharIdx, end: CharIdx, text: impl Into<String>) -> Self {
		Self {
			start,
			end,
			replacement: Some(text.into()),
		}
	}
}

/// Gravity of a tracked position, consulted only when text is inserted
/// exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
	/// Stays in front of the inserted text.
	Left,
	/// Ends up after the inserted text.
	Right,
}

/// One step of a [`ChangeSet`](super::ChangeSet) program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Op {
	/// Copy this many source chars.
	Keep(CharLen),
	/// Skip this many source chars.
	Remove(CharLen),
	/// Emit text; `chars` is its length in chars.
	Insert { text: String, chars: CharLen },
}
