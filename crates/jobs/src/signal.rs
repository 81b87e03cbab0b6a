use std::io;

use tokio::process::Child;

/// Asks the process to exit on its own.
///
/// On unix this is SIGTERM. Elsewhere there is no graceful request, so the
/// process is killed outright.
#[cfg(unix)]
pub(crate) fn request_exit(child: &mut Child) -> io::Result<()> {
	use nix::sys::signal::{Signal, kill};
	use nix::unistd::Pid;

	let Some(pid) = child.id() else {
		// Already reaped.
		return Ok(());
	};
	let pid = i32::try_from(pid).map_err(io::Error::other)?;
	kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(not(unix))]
pub(crate) fn request_exit(child: &mut Child) -> io::Result<()> {
	child.start_kill()
}
