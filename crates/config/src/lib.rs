//! Quill configuration.
//!
//! ```toml
//! [job]
//! command = "llm"
//! args = ["--output", "{output}"]
//! poll_interval_ms = 100
//!
//! [results]
//! dir = "/tmp/quill"
//!
//! [prompt]
//! template = "{instruction}\n\n{selection}\n"
//!
//! [log]
//! level = "info"
//! ```
//!
//! Every key is optional. A missing default file yields the defaults.

mod error;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use error::{ConfigError, Result};
use quill_core::{CoordinatorConfig, TemplatePrompt};
use quill_jobs::{JobCommand, SupervisorConfig};
use serde::Deserialize;

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub job: JobConfig,
	pub results: ResultsConfig,
	pub prompt: PromptConfig,
	pub log: LogConfig,
}

/// The job command and supervision timings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
	pub command: String,
	/// `{output}` is replaced by the artifact path.
	pub args: Vec<String>,
	pub env: BTreeMap<String, String>,
	pub cwd: Option<PathBuf>,
	pub poll_interval_ms: u64,
	pub grace_period_ms: u64,
	pub kill_timeout_ms: u64,
	pub preview_lines: usize,
}

impl Default for JobConfig {
	fn default() -> Self {
		let supervisor = SupervisorConfig::default();
		Self {
			command: "llm".to_string(),
			args: vec!["--output".to_string(), quill_jobs::OUTPUT_PLACEHOLDER.to_string()],
			env: BTreeMap::new(),
			cwd: None,
			poll_interval_ms: millis(supervisor.poll_interval),
			grace_period_ms: millis(supervisor.grace_period),
			kill_timeout_ms: millis(supervisor.kill_timeout),
			preview_lines: supervisor.preview_lines,
		}
	}
}

fn millis(duration: Duration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl JobConfig {
	pub fn command(&self) -> JobCommand {
		let mut command = JobCommand::new(&self.command).args(self.args.iter().cloned());
		for (key, value) in &self.env {
			command = command.env(key, value);
		}
		if let Some(cwd) = &self.cwd {
			command = command.current_dir(cwd);
		}
		command
	}

	pub fn supervisor(&self) -> SupervisorConfig {
		SupervisorConfig {
			poll_interval: Duration::from_millis(self.poll_interval_ms),
			grace_period: Duration::from_millis(self.grace_period_ms),
			kill_timeout: Duration::from_millis(self.kill_timeout_ms),
			preview_lines: self.preview_lines,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResultsConfig {
	/// Artifact directory; a private temporary directory when unset.
	pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PromptConfig {
	/// Prompt template; see [`TemplatePrompt`] for placeholders.
	pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
	/// Default `tracing` filter directive, overridden by `RUST_LOG`.
	pub level: String,
	/// Log file; stderr when unset.
	pub file: Option<PathBuf>,
}

impl Default for LogConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			file: None,
		}
	}
}

impl Config {
	/// `$XDG_CONFIG_HOME/quill/config.toml` or the platform equivalent.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("quill").join("config.toml"))
	}

	/// Parses configuration text.
	pub fn parse(text: &str) -> Result<Self> {
		let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse { path: None, source })?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a configuration file.
	pub fn load(path: &Path) -> Result<Self> {
		let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
			path: Some(path.to_path_buf()),
			source,
		})?;
		config.validate()?;
		Ok(config)
	}

	/// Loads `path` if given, else the default file if it exists, else the
	/// defaults.
	pub fn resolve(path: Option<&Path>) -> Result<Self> {
		match path {
			Some(path) => Self::load(path),
			None => match Self::default_path() {
				Some(path) if path.is_file() => Self::load(&path),
				_ => Ok(Self::default()),
			},
		}
	}

	fn validate(&self) -> Result<()> {
		if self.job.command.trim().is_empty() {
			return Err(ConfigError::Invalid {
				field: "job.command",
				reason: "must not be empty",
			});
		}
		if self.job.poll_interval_ms == 0 {
			return Err(ConfigError::Invalid {
				field: "job.poll_interval_ms",
				reason: "must be greater than zero",
			});
		}
		Ok(())
	}

	pub fn coordinator(&self) -> CoordinatorConfig {
		CoordinatorConfig {
			command: self.job.command(),
			supervisor: self.job.supervisor(),
			results_dir: self.results.dir.clone(),
		}
	}

	/// Prompt built from the configured template, or the default one.
	pub fn prompt(&self, instruction: impl Into<String>) -> TemplatePrompt {
		match &self.prompt.template {
			Some(template) => TemplatePrompt::new(template.clone(), instruction),
			None => TemplatePrompt::with_instruction(instruction),
		}
	}
}
