//! Runs the `quill` binary against temporary files with `sh` standing in for
//! the LLM command.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

const TEXT: &str = "line 0\nline 1\nline 2\n";

/// Writes a config whose job runs `script` with the artifact path as `$1`
/// and receives only the selected text on stdin.
fn setup(script: &str) -> (TempDir, PathBuf, PathBuf) {
	let dir = tempfile::tempdir().unwrap();
	let file = dir.path().join("notes.txt");
	fs::write(&file, TEXT).unwrap();
	let config = dir.path().join("config.toml");
	fs::write(
		&config,
		format!(
			r#"
[job]
command = "sh"
args = ["-c", '{script}', "quill-job", "{{output}}"]
poll_interval_ms = 10
grace_period_ms = 200

[prompt]
template = "{{selection}}"
"#
		),
	)
	.unwrap();
	(dir, file, config)
}

fn quill(file: &Path, config: &Path, args: &[&str]) -> Output {
	Command::new(env!("CARGO_BIN_EXE_quill"))
		.arg(file)
		.arg("--config")
		.arg(config)
		.args(args)
		.env_remove("QUILL_LOG_DIR")
		.env_remove("RUST_LOG")
		.output()
		.unwrap()
}

#[test]
fn rewrites_selected_lines_in_place() {
	let (_dir, file, config) = setup(r#"tr a-z A-Z > "$1""#);

	let output = quill(&file, &config, &["--lines", "2"]);

	assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
	assert_eq!(fs::read_to_string(&file).unwrap(), "line 0\nLINE 1\nline 2\n");
}

#[test]
fn stdout_flag_leaves_file_alone() {
	let (_dir, file, config) = setup(r#"tr a-z A-Z > "$1""#);

	let output = quill(&file, &config, &["--range", "3:1-3:5", "--stdout"]);

	assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
	assert_eq!(String::from_utf8_lossy(&output.stdout), "line 0\nline 1\nLINE 2\n");
	assert_eq!(fs::read_to_string(&file).unwrap(), TEXT);
}

#[test]
fn failing_job_reports_and_keeps_file() {
	let (_dir, file, config) = setup("exit 3");

	let output = quill(&file, &config, &["--lines", "1:2"]);

	assert_eq!(output.status.code(), Some(1));
	assert!(String::from_utf8_lossy(&output.stderr).contains("quill: job failed"));
	assert_eq!(fs::read_to_string(&file).unwrap(), TEXT);
}

#[test]
fn missing_selection_is_a_usage_error() {
	let (_dir, file, config) = setup("exit 0");

	let output = quill(&file, &config, &[]);

	assert_eq!(output.status.code(), Some(2));
	assert_eq!(fs::read_to_string(&file).unwrap(), TEXT);
}
