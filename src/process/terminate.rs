//! Process-group isolation and forced termination
//!
//! Tools are started as the leader of their own process group so that helper
//! processes they spawn (ffmpeg under yt-dlp, sleep under a shell) are killed
//! together with them.

use std::io;
use std::process::Command;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Start the child in a new process group
#[cfg(unix)]
pub(super) fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(windows)]
pub(super) fn isolate(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    command.creation_flags(CREATE_NO_WINDOW);
}

/// Kill the process group led by `pid`
#[cfg(unix)]
pub(super) fn kill_process_tree(pid: u32) -> io::Result<()> {
    let pgid = pid as libc::pid_t;
    if pgid <= 0 {
        return Ok(());
    }

    // SAFETY: kill(2) with a negative pid signals the process group; no memory is shared.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        // Group already gone
        return Ok(());
    }
    Err(err)
}

#[cfg(windows)]
pub(super) fn kill_process_tree(pid: u32) -> io::Result<()> {
    use std::os::windows::process::CommandExt;
    use std::process::Stdio;

    let status = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .creation_flags(CREATE_NO_WINDOW)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;

    // 128: process not found, already exited
    if status.success() || status.code() == Some(128) {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("taskkill exited with {}", status),
        ))
    }
}
