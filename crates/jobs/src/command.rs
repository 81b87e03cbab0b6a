use std::path::{Path, PathBuf};

use tokio::process::Command;

/// Placeholder in command arguments replaced by the job's artifact path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Environment variable carrying the job's artifact path.
pub const OUTPUT_ENV: &str = "QUILL_OUTPUT";

/// The external command run for every job.
///
/// The command reads its prompt on stdin and writes its answer to the
/// artifact path, which it learns from [`OUTPUT_ENV`], from an
/// [`OUTPUT_PLACEHOLDER`] argument, or from the prompt itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCommand {
	pub program: String,
	pub args: Vec<String>,
	pub env: Vec<(String, String)>,
	pub cwd: Option<PathBuf>,
}

impl JobCommand {
	pub fn new(program: impl Into<String>) -> Self {
		Self {
			program: program.into(),
			args: Vec::new(),
			env: Vec::new(),
			cwd: None,
		}
	}

	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.env.push((key.into(), value.into()));
		self
	}

	pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.cwd = Some(dir.into());
		self
	}

	/// Arguments with the output placeholder expanded.
	pub fn expanded_args(&self, output: &Path) -> Vec<String> {
		let output = output.to_string_lossy();
		self.args.iter().map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output)).collect()
	}

	pub(crate) fn to_command(&self, output: &Path) -> Command {
		let mut cmd = Command::new(&self.program);
		cmd.args(self.expanded_args(output))
			.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
			.env(OUTPUT_ENV, output);
		if let Some(cwd) = &self.cwd {
			cmd.current_dir(cwd);
		}
		cmd
	}
}
