//! Rope utilities and extensions.

use ropey::RopeSlice;

use crate::range::{CharIdx, Position};

/// Char index of the first character of `line`, or the end of the text when
/// `line` is one past the last line.
#[inline]
pub fn line_start(text: RopeSlice, line: usize) -> CharIdx {
	if line >= text.len_lines() {
		text.len_chars()
	} else {
		text.line_to_char(line)
	}
}

/// Char index one past the end of `line`, including its line terminator.
#[inline]
pub fn line_end_with_terminator(text: RopeSlice, line: usize) -> CharIdx {
	line_start(text, line + 1)
}

/// Char index one past the last content character of `line`, excluding any
/// `\n` or `\r\n` terminator.
pub fn line_content_end(text: RopeSlice, line: usize) -> CharIdx {
	let start = line_start(text, line);
	let mut end = line_end_with_terminator(text, line);
	if end > start && text.char(end - 1) == '\n' {
		end -= 1;
	}
	if end > start && text.char(end - 1) == '\r' {
		end -= 1;
	}
	end
}

/// Converts a position to a char index.
///
/// Returns `None` if the line does not exist or the column lies past the
/// line's content.
pub fn position_to_char(text: RopeSlice, pos: Position) -> Option<CharIdx> {
	if pos.line >= text.len_lines() {
		return None;
	}
	let start = text.line_to_char(pos.line);
	let idx = start + pos.col;
	(idx <= line_content_end(text, pos.line)).then_some(idx)
}

/// Converts a char index to a position. Indices past the end clamp to the end.
pub fn char_to_position(text: RopeSlice, idx: CharIdx) -> Position {
	let idx = idx.min(text.len_chars());
	let line = text.char_to_line(idx);
	Position::new(line, idx - text.line_to_char(line))
}

#[cfg(test)]
mod tests {
	use ropey::Rope;

	use super::*;

	#[test]
	fn test_line_content_end_strips_crlf() {
		let text = Rope::from("ab\r\ncd\nef");
		assert_eq!(line_content_end(text.slice(..), 0), 2);
		assert_eq!(line_content_end(text.slice(..), 1), 6);
		assert_eq!(line_content_end(text.slice(..), 2), 9);
	}

	#[test]
	fn test_line_start_past_end_clamps() {
		let text = Rope::from("a\nb");
		assert_eq!(line_start(text.slice(..), 1), 2);
		assert_eq!(line_start(text.slice(..), 2), 3);
		assert_eq!(line_start(text.slice(..), 9), 3);
	}

	#[test]
	fn test_position_round_trip() {
		let text = Rope::from("one\ntwo\nthree");
		let slice = text.slice(..);
		let idx = position_to_char(slice, Position::new(2, 3)).unwrap();
		assert_eq!(idx, 11);
		assert_eq!(char_to_position(slice, idx), Position::new(2, 3));
	}

	#[test]
	fn test_position_rejects_out_of_bounds() {
		let text = Rope::from("one\ntwo");
		let slice = text.slice(..);
		assert_eq!(position_to_char(slice, Position::new(0, 4)), None);
		assert_eq!(position_to_char(slice, Position::new(2, 0)), None);
		assert_eq!(position_to_char(slice, Position::new(0, 3)), Some(3));
	}
}
