//! Per-job artifact destinations.
//!
//! Every job gets a fresh, never-before-used file path. The store only
//! reserves the name; the file itself is created by the job process, so a
//! slot that was never written reads as [`io::ErrorKind::NotFound`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use quill_primitives::JobId;
use rustc_hash::FxHashSet;
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

const MAX_ALLOCATION_ATTEMPTS: usize = 8;

/// Handle to one reserved artifact path.
///
/// Not `Clone`: releasing consumes the handle, so a slot is released at most
/// once.
#[derive(Debug, PartialEq, Eq)]
pub struct ResultSlot {
	job: JobId,
	path: PathBuf,
}

impl ResultSlot {
	pub fn job(&self) -> JobId {
		self.job
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

/// Directory of job artifacts shared with the job processes.
#[derive(Debug)]
pub struct ResultStore {
	dir: PathBuf,
	live: FxHashSet<PathBuf>,
	// Keeps a private directory alive; removed with the store.
	_temp: Option<TempDir>,
}

impl ResultStore {
	/// Uses a private temporary directory removed when the store is dropped.
	pub fn temporary() -> io::Result<Self> {
		let temp = tempfile::Builder::new().prefix("quill-results-").tempdir()?;
		Ok(Self {
			dir: temp.path().to_path_buf(),
			live: FxHashSet::default(),
			_temp: Some(temp),
		})
	}

	/// Uses `dir`, creating it if needed. Artifacts are removed as slots are
	/// released; the directory itself is left in place.
	pub fn in_dir(dir: impl Into<PathBuf>) -> io::Result<Self> {
		let dir = dir.into();
		fs::create_dir_all(&dir)?;
		Ok(Self {
			dir,
			live: FxHashSet::default(),
			_temp: None,
		})
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Number of slots allocated and not yet released.
	pub fn live_slots(&self) -> usize {
		self.live.len()
	}

	/// Reserves a fresh artifact path for `job`.
	pub fn allocate(&mut self, job: JobId) -> io::Result<ResultSlot> {
		let pid = std::process::id();
		for _ in 0..MAX_ALLOCATION_ATTEMPTS {
			let name = format!("quill-{pid}-{}-{}.out", job.0, Uuid::new_v4().simple());
			let path = self.dir.join(name);
			if self.live.contains(&path) || path.exists() {
				continue;
			}
			self.live.insert(path.clone());
			debug!(%job, path = %path.display(), "allocated result slot");
			return Ok(ResultSlot { job, path });
		}
		Err(io::Error::new(
			io::ErrorKind::AlreadyExists,
			format!("no free result slot for {job} in {}", self.dir.display()),
		))
	}

	/// Reads the artifact a job wrote to its slot.
	pub fn read(&self, slot: &ResultSlot) -> io::Result<Vec<u8>> {
		fs::read(&slot.path)
	}

	/// Forgets the slot and removes its artifact if one was written.
	pub fn release(&mut self, slot: ResultSlot) -> io::Result<()> {
		self.live.remove(&slot.path);
		match fs::remove_file(&slot.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => {
				warn!(job = %slot.job, path = %slot.path.display(), error = %e, "failed to remove result artifact");
				Err(e)
			}
		}
	}
}
