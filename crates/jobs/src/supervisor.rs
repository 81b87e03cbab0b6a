//! Job process lifecycle.
//!
//! ```text
//! Spawning -> Running -> Completed
//!                     -> Crashed
//!          \-> Terminating -> Aborted
//!                          -> Stuck -> Aborted (if it ever exits)
//! ```
//!
//! Transitions are driven by [`JobSupervisor::poll`], called on a fixed tick.
//! A job leaves the live set in the same tick that observes its exit, before
//! it is handed to the caller, so every job finishes exactly once.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use quill_primitives::{JobId, RegionId};
use rustc_hash::FxHashMap;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tracing::{debug, error, info, warn};

use crate::error::{SpawnError, SpawnFailure};
use crate::{JobCommand, PreviewBuffer, ResultSlot, signal};

#[cfg(test)]
mod tests;

/// Timing and buffering knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
	/// How often the host should call [`JobSupervisor::poll`].
	pub poll_interval: Duration,
	/// Time a job gets to exit after the graceful signal.
	pub grace_period: Duration,
	/// Time a job gets to exit after the forced kill before it is reported stuck.
	pub kill_timeout: Duration,
	/// Lines of stdout/stderr kept per job.
	pub preview_lines: usize,
}

impl Default for SupervisorConfig {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_millis(100),
			grace_period: Duration::from_millis(500),
			kill_timeout: Duration::from_secs(1),
			preview_lines: 50,
		}
	}
}

/// Externally visible state of a live job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
	/// Launched; the prompt is still being written.
	Spawning,
	/// The process accepted its prompt.
	Running,
	/// Cancellation requested; waiting for the process to exit.
	Terminating,
	/// Neither the graceful signal nor the kill ended the process.
	Stuck,
}

/// How a job left the live set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobExit {
	/// Exited successfully; its artifact should be substituted.
	Completed,
	/// Exited after a cancellation request.
	Aborted,
	/// Exited with a failure status or lost its I/O.
	Crashed {
		/// Human-readable cause.
		reason: String,
	},
}

/// A job that has left the live set, with the resources it still owns.
#[derive(Debug)]
pub struct FinishedJob {
	pub id: JobId,
	pub region: RegionId,
	pub slot: ResultSlot,
	pub exit: JobExit,
	pub status: Option<ExitStatus>,
	pub elapsed: Duration,
	/// Last stderr lines, for diagnostics.
	pub stderr_tail: Vec<String>,
}

/// Output of one supervisor tick.
#[derive(Debug)]
pub enum SupervisorEvent {
	/// The job exited and was removed from the live set.
	Finished(FinishedJob),
	/// The job survived graceful and forced termination. It stays live.
	TerminationFailed { id: JobId, region: RegionId },
}

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateRequest {
	/// A termination signal was sent.
	Signalled,
	/// Termination is already under way.
	AlreadyTerminating,
	/// The job is not live (finished or never existed).
	AlreadyGone,
}

/// Read-only snapshot of a live job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
	pub id: JobId,
	pub region: RegionId,
	pub pid: Option<u32>,
	pub state: JobState,
	pub elapsed: Duration,
	pub stdout_preview: Vec<String>,
	pub stderr_preview: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Termination {
	Graceful { deadline: Instant },
	Forced { deadline: Instant },
	Failed,
}

/// Outcome of writing the prompt, shared with the writer task.
#[derive(Debug, Default)]
struct Delivery {
	done: AtomicBool,
	error: Mutex<Option<String>>,
}

#[derive(Debug)]
struct Job {
	id: JobId,
	region: RegionId,
	child: Child,
	pid: Option<u32>,
	started_at: Instant,
	slot: ResultSlot,
	stdout: PreviewBuffer,
	stderr: PreviewBuffer,
	delivery: Arc<Delivery>,
	termination: Option<Termination>,
}

impl Job {
	fn state(&self) -> JobState {
		match self.termination {
			Some(Termination::Failed) => JobState::Stuck,
			Some(_) => JobState::Terminating,
			None if self.delivery.done.load(Ordering::Acquire) => JobState::Running,
			None => JobState::Spawning,
		}
	}

	fn info(&self) -> JobInfo {
		JobInfo {
			id: self.id,
			region: self.region,
			pid: self.pid,
			state: self.state(),
			elapsed: self.started_at.elapsed(),
			stdout_preview: self.stdout.snapshot(),
			stderr_preview: self.stderr.snapshot(),
		}
	}

	fn force_kill(&mut self, now: Instant, config: &SupervisorConfig) {
		if let Err(e) = self.child.start_kill() {
			warn!(job = %self.id, pid = ?self.pid, error = %e, "failed to send kill");
		}
		self.termination = Some(Termination::Forced {
			deadline: now + config.kill_timeout,
		});
	}

	/// Escalates a pending termination whose deadline passed.
	fn advance_termination(&mut self, now: Instant, config: &SupervisorConfig) -> Option<SupervisorEvent> {
		match self.termination {
			Some(Termination::Graceful { deadline }) if now >= deadline => {
				warn!(job = %self.id, pid = ?self.pid, "grace period elapsed, killing job");
				self.force_kill(now, config);
				None
			}
			Some(Termination::Forced { deadline }) if now >= deadline => {
				error!(job = %self.id, pid = ?self.pid, "job survived forced kill");
				self.termination = Some(Termination::Failed);
				Some(SupervisorEvent::TerminationFailed {
					id: self.id,
					region: self.region,
				})
			}
			_ => None,
		}
	}

	fn finish(self, status: io::Result<ExitStatus>) -> FinishedJob {
		let exit = if self.termination.is_some() {
			JobExit::Aborted
		} else {
			match &status {
				Err(e) => JobExit::Crashed {
					reason: format!("failed to wait for process: {e}"),
				},
				Ok(status) => match self.delivery.error.lock().clone() {
					Some(reason) => JobExit::Crashed {
						reason: format!("failed to deliver prompt: {reason}"),
					},
					None if status.success() => JobExit::Completed,
					None => JobExit::Crashed {
						reason: format!("process exited with {status}"),
					},
				},
			}
		};

		let elapsed = self.started_at.elapsed();
		info!(job = %self.id, region = %self.region, ?exit, elapsed_ms = elapsed.as_millis() as u64, "job finished");

		FinishedJob {
			id: self.id,
			region: self.region,
			slot: self.slot,
			exit,
			status: status.ok(),
			elapsed,
			stderr_tail: self.stderr.snapshot(),
		}
	}
}

fn take_pipes(child: &mut Child) -> Result<(ChildStdin, ChildStdout, ChildStderr), &'static str> {
	let stdin = child.stdin.take().ok_or("stdin")?;
	let stdout = child.stdout.take().ok_or("stdout")?;
	let stderr = child.stderr.take().ok_or("stderr")?;
	Ok((stdin, stdout, stderr))
}

/// Owns every live job process.
#[derive(Debug, Default)]
pub struct JobSupervisor {
	jobs: FxHashMap<JobId, Job>,
	next_id: u64,
	config: SupervisorConfig,
}

impl JobSupervisor {
	pub fn new(config: SupervisorConfig) -> Self {
		Self {
			jobs: FxHashMap::default(),
			next_id: 0,
			config,
		}
	}

	pub fn config(&self) -> &SupervisorConfig {
		&self.config
	}

	/// Hands out the id for the next job, before anything is spawned.
	pub fn reserve_id(&mut self) -> JobId {
		self.next_id += 1;
		JobId(self.next_id)
	}

	/// Launches `command` for `region` and delivers `prompt` on its stdin.
	///
	/// Must be called from within a tokio runtime; the prompt write and the
	/// output capture run as background tasks.
	pub fn spawn(
		&mut self,
		id: JobId,
		region: RegionId,
		command: &JobCommand,
		prompt: Vec<u8>,
		slot: ResultSlot,
	) -> Result<JobId, SpawnFailure> {
		let mut cmd = command.to_command(slot.path());
		cmd.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		let mut child = match cmd.spawn() {
			Ok(child) => child,
			Err(source) => {
				error!(%id, program = %command.program, error = %source, "failed to spawn job");
				return Err(SpawnFailure {
					error: SpawnError::Launch {
						program: command.program.clone(),
						source,
					},
					slot,
				});
			}
		};

		let (mut stdin, stdout, stderr) = match take_pipes(&mut child) {
			Ok(pipes) => pipes,
			Err(stream) => {
				error!(%id, program = %command.program, stream, "job is missing a pipe");
				if let Err(e) = child.start_kill() {
					warn!(%id, error = %e, "failed to kill job after pipe setup failed");
				}
				return Err(SpawnFailure {
					error: SpawnError::Pipe {
						program: command.program.clone(),
						stream,
					},
					slot,
				});
			}
		};

		let pid = child.id();
		let delivery = Arc::new(Delivery::default());
		let stdout_preview = PreviewBuffer::new(self.config.preview_lines);
		let stderr_preview = PreviewBuffer::new(self.config.preview_lines);

		let writer = Arc::clone(&delivery);
		tokio::spawn(async move {
			let result = async {
				stdin.write_all(&prompt).await?;
				stdin.shutdown().await
			}
			.await;
			match result {
				Ok(()) => debug!(%id, bytes = prompt.len(), "prompt delivered"),
				// The process closed stdin early; its exit status decides.
				Err(e) if e.kind() == io::ErrorKind::BrokenPipe => debug!(%id, "job closed stdin before reading the whole prompt"),
				Err(e) => {
					warn!(%id, error = %e, "failed to write prompt");
					*writer.error.lock() = Some(e.to_string());
				}
			}
			writer.done.store(true, Ordering::Release);
		});
		tokio::spawn(stdout_preview.clone().capture(stdout));
		tokio::spawn(stderr_preview.clone().capture(stderr));

		info!(%id, %region, ?pid, program = %command.program, "spawned job");

		self.jobs.insert(
			id,
			Job {
				id,
				region,
				child,
				pid,
				started_at: Instant::now(),
				slot,
				stdout: stdout_preview,
				stderr: stderr_preview,
				delivery,
				termination: None,
			},
		);
		Ok(id)
	}

	/// One liveness tick.
	///
	/// Exited jobs are removed and returned; pending terminations are
	/// escalated when their deadline passes.
	pub fn poll(&mut self) -> Vec<SupervisorEvent> {
		let now = Instant::now();
		let mut events = Vec::new();
		let mut exited = Vec::new();

		for (id, job) in &mut self.jobs {
			match job.child.try_wait() {
				Ok(Some(status)) => exited.push((*id, Ok(status))),
				Ok(None) => events.extend(job.advance_termination(now, &self.config)),
				Err(e) => exited.push((*id, Err(e))),
			}
		}

		for (id, status) in exited {
			if let Some(job) = self.jobs.remove(&id) {
				events.push(SupervisorEvent::Finished(job.finish(status)));
			}
		}
		events
	}

	/// Requests cancellation of a live job.
	///
	/// Sends the graceful signal now; [`poll`](Self::poll) escalates to a kill
	/// once the grace period passes. Calling this on a stuck job sends the
	/// kill again.
	pub fn terminate(&mut self, id: JobId) -> TerminateRequest {
		let Some(job) = self.jobs.get_mut(&id) else {
			debug!(%id, "terminate: job already gone");
			return TerminateRequest::AlreadyGone;
		};
		let now = Instant::now();
		match job.termination {
			Some(Termination::Graceful { .. } | Termination::Forced { .. }) => TerminateRequest::AlreadyTerminating,
			Some(Termination::Failed) => {
				warn!(%id, pid = ?job.pid, "retrying kill of stuck job");
				job.force_kill(now, &self.config);
				TerminateRequest::Signalled
			}
			None => {
				info!(%id, pid = ?job.pid, "terminating job");
				if let Err(e) = signal::request_exit(&mut job.child) {
					warn!(%id, error = %e, "graceful termination signal failed");
				}
				job.termination = Some(Termination::Graceful {
					deadline: now + self.config.grace_period,
				});
				TerminateRequest::Signalled
			}
		}
	}

	/// Kills every live job and hands them back as aborted.
	///
	/// Used at teardown; does not wait for the processes to exit.
	pub fn shutdown(&mut self) -> Vec<FinishedJob> {
		let ids: Vec<JobId> = self.jobs.keys().copied().collect();
		ids.into_iter()
			.filter_map(|id| self.jobs.remove(&id))
			.map(|mut job| {
				if let Err(e) = job.child.start_kill() {
					debug!(job = %job.id, error = %e, "kill at teardown failed");
				}
				job.termination = Some(Termination::Failed);
				job.finish(Err(io::Error::other("supervisor shut down")))
			})
			.collect()
	}

	/// Moves a live job into forced termination with an expired deadline,
	/// without signalling it, as if the process had outlived the kill.
	#[cfg(any(test, feature = "test-support"))]
	pub fn expire_forced_kill(&mut self, id: JobId) -> bool {
		let Some(job) = self.jobs.get_mut(&id) else {
			return false;
		};
		job.termination = Some(Termination::Forced { deadline: Instant::now() });
		true
	}

	pub fn info(&self, id: JobId) -> Option<JobInfo> {
		self.jobs.get(&id).map(Job::info)
	}

	pub fn state(&self, id: JobId) -> Option<JobState> {
		self.jobs.get(&id).map(Job::state)
	}

	/// Latest stdout lines of a live job.
	pub fn preview(&self, id: JobId) -> Option<Vec<String>> {
		self.jobs.get(&id).map(|job| job.stdout.snapshot())
	}

	pub fn contains(&self, id: JobId) -> bool {
		self.jobs.contains_key(&id)
	}

	pub fn ids(&self) -> impl Iterator<Item = JobId> + '_ {
		self.jobs.keys().copied()
	}

	pub fn len(&self) -> usize {
		self.jobs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.jobs.is_empty()
	}
}
