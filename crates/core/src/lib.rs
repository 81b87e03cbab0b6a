//! Region-bound job coordination.
//!
//! A [`Coordinator`] ties the pieces together: it opens documents with a
//! [`RegionGuard`] attached, registers a [`Region`] for every started job,
//! drives the [`quill_jobs::JobSupervisor`] on each [`Coordinator::pump`], and
//! hands finished jobs to the [`CompletionHandler`], which substitutes the
//! job's artifact into the region's current location at most once.
//!
//! Everything runs on one cooperative loop. The only state shared with the
//! document edit pipeline is the [`RegionRegistry`], behind a single mutex.

pub mod completion;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod guard;
pub mod prompt;
pub mod registry;

pub use completion::{CompletionHandler, CompletionReport, artifact_lines};
pub use coordinator::{AbortOutcome, Coordinator, CoordinatorConfig, SelectionRequest};
pub use error::{JobOutcome, StartError};
pub use events::CoordinatorEvent;
pub use guard::RegionGuard;
pub use prompt::{PromptBuilder, PromptContext, TemplatePrompt};
pub use registry::{NewRegion, OverlapError, Region, RegionRegistry, SelectionMode, fingerprint, region_span};
