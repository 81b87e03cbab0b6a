use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use quill_primitives::{Bias, Change, DocumentId, EditOrigin, GuardId, JobId, LineSpan, Position, RegionId};

use super::*;

/// Locks a fixed line span on behalf of one job.
struct FixedLock {
	span: LineSpan,
	calls: AtomicUsize,
}

impl FixedLock {
	fn new(span: LineSpan) -> Arc<Self> {
		Arc::new(Self {
			span,
			calls: AtomicUsize::new(0),
		})
	}
}

impl EditGuard for FixedLock {
	fn id(&self) -> GuardId {
		GuardId("fixed-lock")
	}

	fn check(&self, _doc: &Document, span: LineSpan, origin: EditOrigin) -> EditVerdict {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if origin == EditOrigin::Job(JobId(1)) || !span.intersects(&self.span) {
			EditVerdict::Allow
		} else {
			EditVerdict::Deny {
				region: RegionId(1),
				job: JobId(1),
			}
		}
	}
}

fn ten_lines() -> Document {
	let text: String = (0..10).map(|i| format!("line {i}\n")).collect();
	Document::new(DocumentId(1), &text)
}

#[test]
fn insert_above_shifts_tracked_lines() {
	let mut doc = ten_lines();
	let start = doc.create_position(Position::line_start(3), Bias::Right).unwrap();
	let end = doc.create_position(Position::new(5, 6), Bias::Left).unwrap();

	doc.apply_change(Change::insert(0, "new a\nnew b\n"), EditOrigin::User).unwrap();

	assert_eq!(doc.resolve(start), Some(Position::line_start(5)));
	assert_eq!(doc.resolve(end), Some(Position::new(7, 6)));
	assert_eq!(doc.version(), 1);
}

#[test]
fn denied_edit_leaves_document_untouched() {
	let mut doc = ten_lines();
	let lock = FixedLock::new(LineSpan::new(3, 5));
	assert!(doc.attach_guard(lock.clone()));
	let before = doc.contents();
	let anchor = doc.create_position(Position::line_start(4), Bias::Left).unwrap();

	let at = doc.char_at(Position::new(4, 2)).unwrap();
	let err = doc.apply_change(Change::insert(at, "!"), EditOrigin::User).unwrap_err();

	assert_eq!(
		err,
		EditError::Denied {
			region: RegionId(1),
			job: JobId(1)
		}
	);
	assert_eq!(doc.contents(), before);
	assert_eq!(doc.version(), 0);
	assert_eq!(doc.resolve(anchor), Some(Position::line_start(4)));
}

#[test]
fn guard_is_attached_once() {
	let mut doc = ten_lines();
	let lock = FixedLock::new(LineSpan::single(0));
	assert!(doc.attach_guard(lock.clone()));
	assert!(!doc.attach_guard(lock));
	assert_eq!(doc.guard_count(), 1);
}

#[test]
fn owner_and_external_edits_pass_guard() {
	let mut doc = ten_lines();
	let lock = FixedLock::new(LineSpan::new(3, 5));
	doc.attach_guard(lock.clone());

	doc.replace(Position::line_start(4), Position::new(4, 6), "mine", EditOrigin::Job(JobId(1)))
		.unwrap();
	let calls = lock.calls.load(Ordering::SeqCst);
	doc.replace(Position::line_start(3), Position::new(3, 6), "reload", EditOrigin::External)
		.unwrap();

	assert_eq!(lock.calls.load(Ordering::SeqCst), calls);
	assert_eq!(doc.lines_text(LineSpan::new(3, 4)).as_deref(), Some("reload\nmine"));
}

#[test]
fn edits_outside_locked_lines_are_allowed() {
	let mut doc = ten_lines();
	doc.attach_guard(FixedLock::new(LineSpan::new(3, 5)));
	let at = doc.char_at(Position::new(7, 0)).unwrap();
	doc.apply_change(Change::insert(at, "x"), EditOrigin::User).unwrap();
	assert_eq!(doc.lines_text(LineSpan::single(7)).as_deref(), Some("xline 7"));
}

#[test]
fn stale_transaction_is_rejected() {
	let mut doc = ten_lines();
	let tx = Transaction::single(doc.text(), Change::insert(0, "a")).unwrap();
	doc.apply(&tx, EditOrigin::User).unwrap();
	assert!(matches!(doc.apply(&tx, EditOrigin::User), Err(EditError::Stale { .. })));
}

#[test]
fn deleting_anchor_lines_reports_vanished() {
	let mut doc = ten_lines();
	let start = doc.create_position(Position::line_start(3), Bias::Right).unwrap();
	let from = doc.char_at(Position::line_start(2)).unwrap();
	let to = doc.char_at(Position::line_start(7)).unwrap();

	let report = doc.apply_change(Change::delete(from, to), EditOrigin::External).unwrap();

	assert_eq!(report.vanished, vec![start]);
	assert_eq!(doc.resolve(start), None);
	assert!(doc.release_position(start));
}

#[test]
fn create_position_out_of_bounds() {
	let mut doc = ten_lines();
	assert_eq!(
		doc.create_position(Position::new(42, 0), Bias::Left),
		Err(PositionError::OutOfBounds(Position::new(42, 0)))
	);
}

#[test]
fn slice_between_positions() {
	let doc = ten_lines();
	assert_eq!(
		doc.slice_between(Position::new(1, 5), Position::new(2, 4)).as_deref(),
		Some("1\nline")
	);
	assert_eq!(doc.slice_between(Position::new(2, 0), Position::new(1, 0)), None);
}

fn arb_text() -> impl Strategy<Value = String> {
	"[a-z \n]{1,60}"
}

proptest! {
	/// A tracked position keeps pointing at the same character through any
	/// insertion.
	#[test]
	fn tracked_char_survives_inserts(text in arb_text(), insert in "[a-z\n]{1,12}", p in any::<usize>(), q in any::<usize>()) {
		let mut doc = Document::new(DocumentId(1), &text);
		let len = doc.text().len_chars();
		let p = p % len;
		let q = q % (len + 1);
		let original = doc.text().char(p);
		let id = doc.anchors.insert(p, Bias::Right);

		doc.apply_change(Change::insert(q, insert), EditOrigin::User).unwrap();

		let now = doc.resolve_char(id).unwrap();
		prop_assert_eq!(doc.text().char(now), original);
	}

	/// Deletions that do not cover a tracked position either keep it on its
	/// character or report it vanished.
	#[test]
	fn tracked_char_survives_unrelated_deletes(text in arb_text(), p in any::<usize>(), a in any::<usize>(), b in any::<usize>()) {
		let mut doc = Document::new(DocumentId(1), &text);
		let len = doc.text().len_chars();
		let p = p % len;
		let (a, b) = (a % (len + 1), b % (len + 1));
		let (start, end) = (a.min(b), a.max(b));
		prop_assume!(p < start || p >= end);
		let original = doc.text().char(p);
		let id = doc.anchors.insert(p, Bias::Right);

		let report = doc.apply_change(Change::delete(start, end), EditOrigin::User).unwrap();

		match doc.resolve_char(id) {
			Some(now) => prop_assert_eq!(doc.text().char(now), original),
			None => prop_assert_eq!(report.vanished, vec![id]),
		}
	}
}
