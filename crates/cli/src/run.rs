use std::fs;
use std::process::ExitCode;

use anyhow::{Context, bail};
use quill_config::Config;
use quill_core::{Coordinator, CoordinatorEvent, JobOutcome};
use quill_primitives::JobId;
use tracing::{debug, error, info, warn};

use crate::cli::Cli;

/// Exit status after an interrupted job, as shells report SIGINT.
const INTERRUPTED: u8 = 130;

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<ExitCode> {
	let text = fs::read_to_string(&cli.file).with_context(|| format!("failed to read {}", cli.file.display()))?;
	let request = cli.selection().context("no selection given")?;

	let mut coordinator = Coordinator::new(config.coordinator()).context("failed to create the result store")?;
	let doc = coordinator.open_document(&text, Some(cli.file.clone()));
	let prompt = config.prompt(cli.instruction.as_str());
	let job = coordinator.start_job(doc, request, &prompt)?;
	info!(%job, file = %cli.file.display(), "job started");

	let result = wait(&mut coordinator, job).await;
	coordinator.shutdown();

	match result? {
		JobOutcome::Completed { lines } => {
			let contents = coordinator
				.document(doc)
				.map(|doc| doc.contents())
				.context("document was closed")?;
			if cli.stdout {
				print!("{contents}");
			} else {
				fs::write(&cli.file, contents).with_context(|| format!("failed to write {}", cli.file.display()))?;
			}
			info!(%job, lines, "region rewritten");
			Ok(ExitCode::SUCCESS)
		}
		JobOutcome::Aborted => {
			warn!(%job, "job aborted, file left unchanged");
			Ok(ExitCode::from(INTERRUPTED))
		}
		outcome => {
			error!(%job, %outcome, "file left unchanged");
			eprintln!("quill: {outcome}");
			Ok(ExitCode::FAILURE)
		}
	}
}

/// Pumps the coordinator until `job` finishes. The first Ctrl-C aborts it.
async fn wait(coordinator: &mut Coordinator, job: JobId) -> anyhow::Result<JobOutcome> {
	let mut ticker = tokio::time::interval(coordinator.poll_interval());
	let ctrl_c = tokio::signal::ctrl_c();
	tokio::pin!(ctrl_c);
	let mut interrupted = false;

	loop {
		tokio::select! {
			_ = ticker.tick() => {
				coordinator.pump();
				for event in coordinator.drain_events() {
					match event {
						CoordinatorEvent::JobFinished { job: finished, outcome, .. } if finished == job => return Ok(outcome),
						CoordinatorEvent::TerminationFailed { job: stuck, .. } if stuck == job => {
							bail!("{job} could not be terminated");
						}
						CoordinatorEvent::RegionVanished { region, .. } => {
							warn!(%job, %region, "region deleted while the job runs, its output will be discarded");
						}
						event => debug!(?event, "coordinator event"),
					}
				}
			}
			signal = &mut ctrl_c, if !interrupted => {
				signal.context("failed to listen for ctrl-c")?;
				interrupted = true;
				warn!(%job, "interrupted, aborting job");
				coordinator.abort_job(job);
			}
		}
	}
}
