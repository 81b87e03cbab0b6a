//! Core types for region tracking: identifiers, coordinates, and change sets.

/// Edit provenance.
pub mod edit;
/// Identifier types for documents, regions, jobs and anchors.
pub mod ids;
/// Char, position and line-span coordinate types.
pub mod range;
/// Rope utilities and extensions.
pub mod rope;
/// Change primitives and position mapping.
pub mod transaction;

pub use edit::EditOrigin;
pub use ids::{DocumentId, GuardId, JobId, PositionId, RegionId};
pub use range::{CharIdx, CharLen, LineSpan, Position};
pub use ropey::{Rope, RopeSlice};
pub use transaction::{Bias, Change, ChangeError, ChangeSet, Transaction};
