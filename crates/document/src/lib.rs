//! Editable documents for Quill.
//!
//! A [`Document`] owns its text, an arena of tracked positions that move with
//! edits, and the guards consulted before any edit is applied. Check and apply
//! happen inside a single `&mut Document` call, so a guard can never approve an
//! edit against a state that changes before the edit lands.

pub mod anchor;
mod document;
pub mod error;
pub mod guard;
mod store;

pub use anchor::AnchorArena;
pub use document::{Document, EditReport};
pub use error::{EditError, PositionError};
pub use guard::{EditGuard, EditVerdict};
pub use store::DocumentStore;
