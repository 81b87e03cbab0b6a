/// A position in the text, measured in characters (not bytes).
///
/// This is the canonical internal coordinate space; line/column pairs are
/// derived from it on demand.
pub type CharIdx = usize;

/// A length or count in the text, measured in characters (not bytes).
///
/// This is distinct from CharIdx to avoid accidentally passing an index
/// where a length is expected or vice versa.
pub type CharLen = usize;

/// A zero-based `(line, column)` coordinate, columns counted in chars.
///
/// Ordering is document order: first by line, then by column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
	/// Zero-based line index.
	pub line: usize,
	/// Zero-based column, in chars from the start of the line.
	pub col: usize,
}

impl Position {
	/// Creates a new position.
	pub const fn new(line: usize, col: usize) -> Self {
		Self { line, col }
	}

	/// Position at the start of `line`.
	pub const fn line_start(line: usize) -> Self {
		Self { line, col: 0 }
	}
}

/// An inclusive span of lines.
///
/// Overlap between regions and edits is decided at this granularity: two
/// spans overlap when they share at least one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineSpan {
	/// First line of the span.
	pub start: usize,
	/// Last line of the span (inclusive).
	pub end: usize,
}

impl LineSpan {
	/// Creates a span covering `a..=b`, normalising the order.
	pub fn new(a: usize, b: usize) -> Self {
		Self {
			start: a.min(b),
			end: a.max(b),
		}
	}

	/// Span of a single line.
	pub const fn single(line: usize) -> Self {
		Self { start: line, end: line }
	}

	/// Number of lines in the span.
	#[inline]
	pub fn len(&self) -> usize {
		self.end - self.start + 1
	}

	/// Spans always contain at least one line.
	#[inline]
	pub fn is_empty(&self) -> bool {
		false
	}

	/// Returns true if `line` lies within the span.
	#[inline]
	pub fn contains(&self, line: usize) -> bool {
		self.start <= line && line <= self.end
	}

	/// Returns true if both spans share at least one line.
	#[inline]
	pub fn intersects(&self, other: &LineSpan) -> bool {
		self.start <= other.end && other.start <= self.end
	}
}
