//! Tracked positions.
//!
//! Anchors are char offsets kept in a slab and remapped through every applied
//! transaction, so business logic never caches raw coordinates. An anchor whose
//! text is deleted out from under it is marked vanished and resolves to
//! nothing until it is released.

use quill_primitives::rope::{line_end_with_terminator, line_start};
use quill_primitives::{Bias, CharIdx, PositionId, RopeSlice, Transaction};
use slab::Slab;

#[derive(Debug, Clone, Copy)]
struct Anchor {
	offset: CharIdx,
	bias: Bias,
	vanished: bool,
}

/// Arena of tracked positions for one document.
#[derive(Debug, Default)]
pub struct AnchorArena {
	anchors: Slab<Anchor>,
}

impl AnchorArena {
	/// Tracks `offset` with the given gravity.
	pub fn insert(&mut self, offset: CharIdx, bias: Bias) -> PositionId {
		PositionId(self.anchors.insert(Anchor {
			offset,
			bias,
			vanished: false,
		}))
	}

	/// Current offset, or `None` if the anchor was released or vanished.
	pub fn offset(&self, id: PositionId) -> Option<CharIdx> {
		self.anchors.get(id.0).filter(|a| !a.vanished).map(|a| a.offset)
	}

	/// Gravity of a live anchor.
	pub fn bias(&self, id: PositionId) -> Option<Bias> {
		self.anchors.get(id.0).map(|a| a.bias)
	}

	/// Returns true if the anchor exists but its text was deleted.
	pub fn is_vanished(&self, id: PositionId) -> bool {
		self.anchors.get(id.0).is_some_and(|a| a.vanished)
	}

	/// Stops tracking an anchor. Returns false if it was already released.
	pub fn remove(&mut self, id: PositionId) -> bool {
		self.anchors.try_remove(id.0).is_some()
	}

	/// Number of anchors held, vanished ones included.
	pub fn len(&self) -> usize {
		self.anchors.len()
	}

	/// Returns true if no anchors are held.
	pub fn is_empty(&self) -> bool {
		self.anchors.is_empty()
	}

	/// Remaps every anchor through `tx`, which is about to be applied to
	/// `before`. Returns the anchors that vanished during this edit.
	pub(crate) fn map_through(&mut self, before: RopeSlice, tx: &Transaction) -> Vec<PositionId> {
		let mut vanished = Vec::new();
		for (key, anchor) in self.anchors.iter_mut() {
			if anchor.vanished {
				continue;
			}
			if removes_anchor(before, tx, anchor.offset) {
				anchor.vanished = true;
				vanished.push(PositionId(key));
				continue;
			}
			anchor.offset = tx.changes().map_pos(anchor.offset, anchor.bias);
		}
		vanished
	}
}

/// An anchor is removed when a deletion strictly contains it, or when a
/// deletion takes out its entire line.
fn removes_anchor(before: RopeSlice, tx: &Transaction, pos: CharIdx) -> bool {
	tx.edits().iter().filter(|c| c.end > c.start).any(|change| {
		if change.start < pos && pos < change.end {
			return true;
		}
		if pos < change.start || pos > change.end {
			return false;
		}
		let line = before.char_to_line(pos);
		let ls = line_start(before, line);
		let le = line_end_with_terminator(before, line);
		le > ls && change.start <= ls && le <= change.end
	})
}
