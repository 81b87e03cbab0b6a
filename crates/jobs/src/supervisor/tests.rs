use std::time::Duration;

use super::*;
use crate::ResultStore;

fn sh(script: &str) -> JobCommand {
	JobCommand::new("sh").args(["-c", script])
}

fn fast_config() -> SupervisorConfig {
	SupervisorConfig {
		poll_interval: Duration::from_millis(10),
		grace_period: Duration::from_millis(100),
		kill_timeout: Duration::from_secs(2),
		preview_lines: 8,
	}
}

async fn next_finished(supervisor: &mut JobSupervisor) -> FinishedJob {
	for _ in 0..500 {
		for event in supervisor.poll() {
			if let SupervisorEvent::Finished(job) = event {
				return job;
			}
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("job did not finish in time");
}

fn start(supervisor: &mut JobSupervisor, store: &mut ResultStore, command: &JobCommand, prompt: &str) -> JobId {
	let id = supervisor.reserve_id();
	let slot = store.allocate(id).unwrap();
	supervisor
		.spawn(id, RegionId(id.0), command, prompt.as_bytes().to_vec(), slot)
		.unwrap()
}

#[tokio::test]
async fn completed_job_leaves_live_set_exactly_once() {
	let mut store = ResultStore::temporary().unwrap();
	let mut supervisor = JobSupervisor::new(fast_config());
	let cmd = sh(r#"cat > /dev/null; printf 'x\ny\n' > "$QUILL_OUTPUT""#);
	let id = start(&mut supervisor, &mut store, &cmd, "prompt");

	let finished = next_finished(&mut supervisor).await;
	assert_eq!(finished.id, id);
	assert_eq!(finished.region, RegionId(id.0));
	assert_eq!(finished.exit, JobExit::Completed);
	assert_eq!(store.read(&finished.slot).unwrap(), b"x\ny\n");

	assert!(!supervisor.contains(id));
	assert!(supervisor.poll().is_empty());
	assert_eq!(supervisor.terminate(id), TerminateRequest::AlreadyGone);
	store.release(finished.slot).unwrap();
}

#[tokio::test]
async fn prompt_is_delivered_on_stdin() {
	let mut store = ResultStore::temporary().unwrap();
	let mut supervisor = JobSupervisor::new(fast_config());
	let cmd = sh(r#"cat > "$QUILL_OUTPUT""#);
	start(&mut supervisor, &mut store, &cmd, "rewrite this\n");

	let finished = next_finished(&mut supervisor).await;
	assert_eq!(finished.exit, JobExit::Completed);
	assert_eq!(store.read(&finished.slot).unwrap(), b"rewrite this\n");
}

#[tokio::test]
async fn failing_exit_status_is_a_crash() {
	let mut store = ResultStore::temporary().unwrap();
	let mut supervisor = JobSupervisor::new(fast_config());
	start(&mut supervisor, &mut store, &sh("exit 3"), "");

	let finished = next_finished(&mut supervisor).await;
	assert!(matches!(finished.exit, JobExit::Crashed { .. }));
	assert_eq!(finished.status.and_then(|s| s.code()), Some(3));
	assert_eq!(store.read(&finished.slot).unwrap_err().kind(), io::ErrorKind::NotFound);
}

#[tokio::test]
async fn launch_failure_returns_the_slot() {
	let mut store = ResultStore::temporary().unwrap();
	let mut supervisor = JobSupervisor::new(fast_config());
	let id = supervisor.reserve_id();
	let slot = store.allocate(id).unwrap();

	let failure = supervisor
		.spawn(id, RegionId(1), &JobCommand::new("/nonexistent/quill-test-program"), Vec::new(), slot)
		.unwrap_err();

	assert!(matches!(failure.error, SpawnError::Launch { .. }));
	assert_eq!(failure.slot.job(), id);
	assert!(supervisor.is_empty());
	store.release(failure.slot).unwrap();
	assert_eq!(store.live_slots(), 0);
}

#[tokio::test]
async fn terminated_job_is_aborted() {
	let mut store = ResultStore::temporary().unwrap();
	let mut supervisor = JobSupervisor::new(fast_config());
	let id = start(&mut supervisor, &mut store, &sh("exec sleep 30"), "");

	let info = supervisor.info(id).unwrap();
	assert_eq!(info.region, RegionId(id.0));
	assert!(info.pid.is_some());

	assert_eq!(supervisor.terminate(id), TerminateRequest::Signalled);
	assert_eq!(supervisor.terminate(id), TerminateRequest::AlreadyTerminating);
	assert_eq!(supervisor.info(id).map(|i| i.state), Some(JobState::Terminating));

	let finished = next_finished(&mut supervisor).await;
	assert_eq!(finished.id, id);
	assert_eq!(finished.exit, JobExit::Aborted);
}

#[cfg(unix)]
#[tokio::test]
async fn ignored_graceful_signal_escalates_to_kill() {
	let mut store = ResultStore::temporary().unwrap();
	let mut supervisor = JobSupervisor::new(fast_config());
	let id = start(&mut supervisor, &mut store, &sh("trap '' TERM; while :; do sleep 0.05; done"), "");
	tokio::time::sleep(Duration::from_millis(50)).await;

	supervisor.terminate(id);
	let finished = next_finished(&mut supervisor).await;

	assert_eq!(finished.exit, JobExit::Aborted);
	assert!(finished.elapsed >= fast_config().grace_period);
}

#[tokio::test]
async fn job_surviving_the_kill_is_stuck_until_killed_again() {
	let mut store = ResultStore::temporary().unwrap();
	let mut supervisor = JobSupervisor::new(fast_config());
	let id = start(&mut supervisor, &mut store, &sh("exec sleep 30"), "");
	assert!(supervisor.expire_forced_kill(id));

	let events = supervisor.poll();
	assert!(matches!(
		events.as_slice(),
		[SupervisorEvent::TerminationFailed { id: i, region }] if *i == id && *region == RegionId(id.0)
	));
	assert_eq!(supervisor.state(id), Some(JobState::Stuck));
	assert!(supervisor.poll().is_empty());
	assert_eq!(supervisor.state(id), Some(JobState::Stuck));

	assert_eq!(supervisor.terminate(id), TerminateRequest::Signalled);
	assert_eq!(supervisor.state(id), Some(JobState::Terminating));
	let finished = next_finished(&mut supervisor).await;
	assert_eq!(finished.id, id);
	assert_eq!(finished.exit, JobExit::Aborted);
	assert!(!supervisor.expire_forced_kill(id));
}

#[tokio::test]
async fn shutdown_kills_everything() {
	let mut store = ResultStore::temporary().unwrap();
	let mut supervisor = JobSupervisor::new(fast_config());
	let a = start(&mut supervisor, &mut store, &sh("exec sleep 30"), "");
	let b = start(&mut supervisor, &mut store, &sh("exec sleep 30"), "");

	let mut drained: Vec<JobId> = supervisor
		.shutdown()
		.into_iter()
		.inspect(|job| assert_eq!(job.exit, JobExit::Aborted))
		.map(|job| job.id)
		.collect();
	drained.sort();

	assert_eq!(drained, vec![a, b]);
	assert!(supervisor.is_empty());
}

#[test]
fn reserved_ids_increase() {
	let mut supervisor = JobSupervisor::default();
	let a = supervisor.reserve_id();
	let b = supervisor.reserve_id();
	assert!(b > a);
}

#[tokio::test]
async fn preview_is_only_available_while_live() {
	let mut store = ResultStore::temporary().unwrap();
	let mut supervisor = JobSupervisor::new(fast_config());
	let id = start(&mut supervisor, &mut store, &sh("exec sleep 30"), "");

	assert_eq!(supervisor.preview(id), Some(Vec::new()));
	supervisor.terminate(id);
	next_finished(&mut supervisor).await;
	assert_eq!(supervisor.preview(id), None);
}
