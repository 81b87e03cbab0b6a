use quill_primitives::{Bias, Change, EditOrigin, Position};

use super::*;

fn ten_lines() -> Document {
	let text: String = (0..10).map(|i| format!("line {i}\n")).collect();
	Document::new(DocumentId(1), &text)
}

fn lines(doc: &mut Document, first: usize, last: usize, job: u64) -> (LineSpan, NewRegion) {
	let start = doc.create_position(Position::line_start(first), Bias::Right).unwrap();
	let end = doc.create_position(Position::new(last, 6), Bias::Left).unwrap();
	let new = NewRegion {
		document: doc.id(),
		start,
		end,
		mode: SelectionMode::Line,
		fingerprint: 0,
		job: JobId(job),
	};
	(LineSpan::new(first, last), new)
}

#[test]
fn disjoint_regions_register_and_overlap_is_rejected() {
	let mut doc = ten_lines();
	let mut registry = RegionRegistry::new();

	let (span, new) = lines(&mut doc, 1, 2, 1);
	let a = registry.register(&doc, span, new).unwrap();
	let (span, new) = lines(&mut doc, 4, 5, 2);
	registry.register(&doc, span, new).unwrap();

	let (span, new) = lines(&mut doc, 2, 4, 3);
	let err = registry.register(&doc, span, new).unwrap_err();
	assert_eq!(err, OverlapError { region: a, job: JobId(1) });
	assert_eq!(registry.len(), 2);
}

#[test]
fn adjacent_lines_do_not_overlap() {
	let mut doc = ten_lines();
	let mut registry = RegionRegistry::new();
	let (span, new) = lines(&mut doc, 2, 3, 1);
	let id = registry.register(&doc, span, new).unwrap();

	assert_eq!(registry.find_overlapping(&doc, LineSpan::new(4, 9)), None);
	assert_eq!(registry.find_overlapping(&doc, LineSpan::new(0, 1)), None);
	assert_eq!(registry.find_overlapping(&doc, LineSpan::new(3, 9)), Some(id));
	assert_eq!(registry.find_containing(&doc, 2), Some(id));
	assert_eq!(registry.find_containing(&doc, 4), None);
}

#[test]
fn spans_follow_edits() {
	let mut doc = ten_lines();
	let mut registry = RegionRegistry::new();
	let (span, new) = lines(&mut doc, 3, 5, 1);
	let id = registry.register(&doc, span, new).unwrap();

	doc.apply_change(Change::insert(0, "a\nb\n"), EditOrigin::External).unwrap();

	assert_eq!(registry.span(&doc, id), Some(LineSpan::new(5, 7)));
	assert_eq!(registry.find_containing(&doc, 3), None);
	assert_eq!(registry.find_containing(&doc, 7), Some(id));
}

#[test]
fn vanished_regions_do_not_block() {
	let mut doc = ten_lines();
	let mut registry = RegionRegistry::new();
	let (span, new) = lines(&mut doc, 3, 5, 1);
	let id = registry.register(&doc, span, new).unwrap();

	let from = doc.char_at(Position::line_start(2)).unwrap();
	let to = doc.char_at(Position::line_start(7)).unwrap();
	doc.apply_change(Change::delete(from, to), EditOrigin::External).unwrap();

	assert_eq!(registry.span(&doc, id), None);
	let spans: Vec<_> = registry.spans_in(&doc).into_iter().map(|(r, span)| (r.id, span)).collect();
	assert_eq!(spans, vec![(id, None)]);
	assert_eq!(registry.find_containing(&doc, 2), None);

	let (span, new) = lines(&mut doc, 2, 3, 2);
	assert!(registry.register(&doc, span, new).is_ok());
}

#[test]
fn regions_of_other_documents_are_ignored() {
	let mut doc = ten_lines();
	let mut other = Document::new(DocumentId(2), "x\ny\n");
	let mut registry = RegionRegistry::new();
	let (span, new) = lines(&mut doc, 0, 1, 1);
	let id = registry.register(&doc, span, new).unwrap();

	assert_eq!(registry.find_containing(&other, 0), None);
	assert_eq!(registry.span(&other, id), None);
	let start = other.create_position(Position::line_start(0), Bias::Right).unwrap();
	let end = other.create_position(Position::new(0, 1), Bias::Left).unwrap();
	let new = NewRegion {
		document: other.id(),
		start,
		end,
		mode: SelectionMode::Char,
		fingerprint: 0,
		job: JobId(2),
	};
	assert!(registry.register(&other, LineSpan::single(0), new).is_ok());
	assert_eq!(registry.regions_in(doc.id()).count(), 1);
}

#[test]
fn release_is_idempotent() {
	let mut doc = ten_lines();
	let mut registry = RegionRegistry::new();
	let (span, new) = lines(&mut doc, 0, 0, 1);
	let id = registry.register(&doc, span, new).unwrap();

	assert_eq!(registry.release(id).map(|r| r.job), Some(JobId(1)));
	assert_eq!(registry.release(id), None);
	assert!(registry.is_empty());
}

#[test]
fn fingerprint_tracks_text() {
	assert_eq!(fingerprint("line 3\nline 4"), fingerprint("line 3\nline 4"));
	assert_ne!(fingerprint("line 3\nline 4"), fingerprint("line 3\nline 5"));
}
