use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgGroup, Parser};
use quill_core::{SelectionMode, SelectionRequest};
use quill_primitives::Position;

/// Instruction used when none is given on the command line.
pub const DEFAULT_INSTRUCTION: &str = "Rewrite the selection.";

#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Rewrite part of a file with an external LLM command")]
#[command(version)]
#[command(group(ArgGroup::new("selection").required(true).args(["lines", "range"])))]
/// Command-line arguments.
pub struct Cli {
	/// File to rewrite
	pub file: PathBuf,

	/// Lines to rewrite, 1-indexed and inclusive (e.g. 4:6, or 4)
	#[arg(short, long, value_name = "START:END")]
	pub lines: Option<LineRange>,

	/// Exact span to rewrite, 1-indexed with an exclusive end (e.g. 2:5-3:1)
	#[arg(short, long, value_name = "L:C-L:C")]
	pub range: Option<CharRange>,

	/// Treat --range as a block selection
	#[arg(long, requires = "range")]
	pub block: bool,

	/// Instruction placed into the prompt
	#[arg(short, long, default_value = DEFAULT_INSTRUCTION)]
	pub instruction: String,

	/// Configuration file (defaults to the user config directory)
	#[arg(short, long, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Print the rewritten file instead of saving it
	#[arg(long)]
	pub stdout: bool,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,
}

impl Cli {
	/// The selection to bind the job to, in zero-based coordinates.
	pub fn selection(&self) -> Option<SelectionRequest> {
		if let Some(lines) = self.lines {
			return Some(SelectionRequest::lines(lines.first, lines.last));
		}
		self.range.map(|range| SelectionRequest {
			start: range.start,
			end: range.end,
			mode: if self.block { SelectionMode::Block } else { SelectionMode::Char },
		})
	}
}

/// Inclusive line range, stored zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
	pub first: usize,
	pub last: usize,
}

impl FromStr for LineRange {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (first, last) = match s.split_once(':') {
			Some((first, last)) => (line_number(first)?, line_number(last)?),
			None => {
				let line = line_number(s)?;
				(line, line)
			}
		};
		if last < first {
			return Err(format!("range {s} ends before it starts"));
		}
		Ok(Self { first, last })
	}
}

/// Char span between two `LINE:COL` positions, stored zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRange {
	pub start: Position,
	pub end: Position,
}

impl FromStr for CharRange {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (start, end) = s
			.split_once('-')
			.ok_or_else(|| format!("expected LINE:COL-LINE:COL, got {s}"))?;
		let range = Self {
			start: position(start)?,
			end: position(end)?,
		};
		if range.end <= range.start {
			return Err(format!("range {s} is empty or inverted"));
		}
		Ok(range)
	}
}

/// Parses a 1-indexed line number into a zero-based index.
fn line_number(s: &str) -> Result<usize, String> {
	match s.trim().parse::<usize>() {
		Ok(0) | Err(_) => Err(format!("invalid line number {s:?}")),
		Ok(n) => Ok(n - 1),
	}
}

fn position(s: &str) -> Result<Position, String> {
	let (line, col) = s
		.split_once(':')
		.ok_or_else(|| format!("expected LINE:COL, got {s:?}"))?;
	let col = line_number(col).map_err(|_| format!("invalid column {col:?}"))?;
	Ok(Position::new(line_number(line)?, col))
}
