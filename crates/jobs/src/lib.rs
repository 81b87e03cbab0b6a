//! Supervision of external job processes.
//!
//! [`JobSupervisor`] owns every spawned process: it delivers the prompt on
//! stdin, captures output previews, probes liveness on each tick, and walks
//! cancelled jobs through graceful then forced termination. [`ResultStore`]
//! hands each job a private artifact path that the process writes its answer
//! to.

mod command;
pub mod error;
mod preview;
pub mod result_store;
mod signal;
pub mod supervisor;

pub use command::{JobCommand, OUTPUT_ENV, OUTPUT_PLACEHOLDER};
pub use error::{SpawnError, SpawnFailure};
pub use preview::PreviewBuffer;
pub use result_store::{ResultSlot, ResultStore};
pub use supervisor::{
	FinishedJob, JobExit, JobInfo, JobState, JobSupervisor, SupervisorConfig, SupervisorEvent, TerminateRequest,
};
