use crate::ids::JobId;

/// Where an edit comes from.
///
/// Guards only ever see `User` and `Job` edits; `External` edits (file
/// reloads, collaborator resets) bypass them entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
	/// Interactive edit from the front end.
	User,
	/// Substitution performed on behalf of a finished job.
	Job(JobId),
	/// Edit that cannot be refused, such as reloading the file from disk.
	External,
}

impl EditOrigin {
	/// Returns true if guards should be consulted for this edit.
	pub const fn is_guarded(self) -> bool {
		!matches!(self, Self::External)
	}
}
