use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("failed to parse {}: {source}", origin(path.as_deref()))]
	Parse {
		/// File the text came from; `None` for inline text.
		path: Option<PathBuf>,
		#[source]
		source: toml::de::Error,
	},
	/// The file parsed but a value is unusable.
	#[error("invalid `{field}`: {reason}")]
	Invalid { field: &'static str, reason: &'static str },
}

fn origin(path: Option<&Path>) -> String {
	path.map_or_else(|| "inline config".to_string(), |p| p.display().to_string())
}

pub type Result<T> = std::result::Result<T, ConfigError>;
