use std::fmt;

macro_rules! define_id {
	($(#[$meta:meta])* $name:ident, $inner:ty, $prefix:literal) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
		pub struct $name(pub $inner);

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, concat!($prefix, "#{}"), self.0)
			}
		}
	};
}

define_id!(
	/// Identifies an open document.
	DocumentId,
	u64,
	"doc"
);
define_id!(
	/// Identifies a live region in the region registry.
	RegionId,
	u64,
	"region"
);
define_id!(
	/// Identifies one supervised subprocess invocation.
	JobId,
	u64,
	"job"
);
define_id!(
	/// Key of a tracked position in a document's anchor arena.
	PositionId,
	usize,
	"pos"
);

/// Identity of an edit guard, used to make attaching idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuardId(pub &'static str);
