use super::types::{Bias, Op};
use crate::Rope;
use crate::range::{CharIdx, CharLen};

/// A transaction compiled to a linear retain/delete/insert program over the
/// source text.
///
/// Applying the edit and remapping tracked positions are both one forward
/// walk over the program.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
	ops: Vec<Op>,
	/// Chars consumed from the source.
	len: CharLen,
	/// Chars produced in the target.
	len_after: CharLen,
}

impl ChangeSet {
	/// Length of the text this set applies to.
	pub fn len(&self) -> CharLen {
		self.len
	}

	/// Length of the text after applying this set.
	pub fn len_after(&self) -> CharLen {
		self.len_after
	}

	pub fn is_empty(&self) -> bool {
		self.ops.is_empty()
	}

	pub(crate) fn retain(&mut self, n: CharLen) {
		if n == 0 {
			return;
		}
		self.len += n;
		self.len_after += n;
		match self.ops.last_mut() {
			Some(Op::Keep(kept)) => *kept += n,
			_ => self.ops.push(Op::Keep(n)),
		}
	}

	pub(crate) fn delete(&mut self, n: CharLen) {
		if n == 0 {
			return;
		}
		self.len += n;
		match self.ops.last_mut() {
			Some(Op::Remove(removed)) => *removed += n,
			_ => self.ops.push(Op::Remove(n)),
		}
	}

	/// Appends inserted text. Inserts are kept ahead of an adjacent removal,
	/// so a replacement always reads `Insert, Remove`.
	pub(crate) fn insert(&mut self, text: String) {
		let chars = text.chars().count();
		if chars == 0 {
			return;
		}
		self.len_after += chars;

		let at = match self.ops.as_slice() {
			[.., Op::Insert { .. }] => Some(self.ops.len() - 1),
			[.., Op::Insert { .. }, Op::Remove(_)] => Some(self.ops.len() - 2),
			_ => None,
		};
		if let Some(Op::Insert { text: prev, chars: prev_chars }) = at.and_then(|i| self.ops.get_mut(i)) {
			prev.push_str(&text);
			*prev_chars += chars;
			return;
		}

		let op = Op::Insert { text, chars };
		if matches!(self.ops.last(), Some(Op::Remove(_))) {
			let index = self.ops.len() - 1;
			self.ops.insert(index, op);
		} else {
			self.ops.push(op);
		}
	}

	/// Rewrites `doc` in place. `doc` must be the source text.
	pub fn apply(&self, doc: &mut Rope) {
		let mut cursor = 0;
		for op in &self.ops {
			match op {
				Op::Keep(n) => cursor += n,
				Op::Remove(n) => doc.remove(cursor..cursor + n),
				Op::Insert { text, chars } => {
					doc.insert(cursor, text);
					cursor += chars;
				}
			}
		}
	}

	/// Where source offset `pos` lands in the target text.
	///
	/// An offset inside removed text collapses to the removal point. At an
	/// insertion point, `Bias::Left` stays before the inserted text and
	/// `Bias::Right` moves past it.
	pub fn map_pos(&self, pos: CharIdx, bias: Bias) -> CharIdx {
		let mut src = 0;
		let mut dst = 0;
		for op in &self.ops {
			match *op {
				Op::Keep(n) if pos < src + n => return dst + (pos - src),
				Op::Keep(n) => {
					src += n;
					dst += n;
				}
				Op::Remove(n) if pos < src + n => return dst,
				Op::Remove(n) => src += n,
				Op::Insert { chars, .. } => {
					if pos < src {
						break;
					}
					if pos > src || bias == Bias::Right {
						dst += chars;
					}
				}
			}
		}
		dst + (pos - src)
	}
}
