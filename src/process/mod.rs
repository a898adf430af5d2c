//! Supervision of long-running external tools
//!
//! A [`ProcessSupervisor`] starts one child at a time, streams its stdout and
//! stderr line by line, exposes a cancellation switch that kills the child's
//! whole process group, and turns the exit status into a [`ProcessOutcome`].

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::BufReader;
use tracing::{debug, info, trace, warn};

use crate::domain::errors::SupervisorError;

pub mod lines;
mod terminate;

pub use lines::LineReader;

/// Number of stderr lines kept for diagnostics
pub const STDERR_TAIL_LINES: usize = 40;

/// How to launch an external tool, optionally through an interpreter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub prefix_args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    /// Arguments inserted before the generated ones, e.g. `-m yt_dlp` for `python3`
    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn display_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or_else(|| self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Whether the program resolves to an executable (path or PATH lookup)
    pub fn is_available(&self) -> bool {
        if self.program.components().count() > 1 {
            return self.program.is_file();
        }
        which::which(&self.program).is_ok()
    }

    fn std_command<S: AsRef<OsStr>>(&self, args: &[S]) -> std::process::Command {
        let mut command = std::process::Command::new(&self.program);
        command.args(&self.prefix_args).args(args);
        terminate::isolate(&mut command);
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> SupervisorError {
        if source.kind() == std::io::ErrorKind::NotFound
            || source.kind() == std::io::ErrorKind::PermissionDenied
        {
            SupervisorError::ToolUnavailable {
                program: self.program.display().to_string(),
                source,
            }
        } else {
            SupervisorError::Io {
                program: self.program.display().to_string(),
                source,
            }
        }
    }
}

/// A line read from the child's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

impl OutputLine {
    pub fn text(&self) -> &str {
        match self {
            OutputLine::Stdout(line) | OutputLine::Stderr(line) => line,
        }
    }

    pub fn is_stderr(&self) -> bool {
        matches!(self, OutputLine::Stderr(_))
    }
}

/// Live child process: its pid and the cancellation flag
#[derive(Debug)]
pub struct ProcessHandle {
    program: String,
    /// 0 until spawned and again once reaped
    pid: AtomicU32,
    cancelled: AtomicBool,
}

impl ProcessHandle {
    fn new(program: String) -> Self {
        Self {
            program,
            pid: AtomicU32::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Set the flag and kill the process group if the child is running
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            info!(program = %self.program, pid = ?self.pid(), "Cancellation requested");
        }
        self.terminate();
    }

    fn attach(&self, pid: u32) {
        self.pid.store(pid, Ordering::SeqCst);
        // Cancelled between reservation and spawn
        if self.is_cancelled() {
            self.terminate();
        }
    }

    fn detach(&self) {
        self.pid.store(0, Ordering::SeqCst);
    }

    fn terminate(&self) {
        if let Some(pid) = self.pid() {
            if let Err(e) = terminate::kill_process_tree(pid) {
                warn!(program = %self.program, pid, error = %e, "Failed to kill process group");
            } else {
                debug!(program = %self.program, pid, "Killed process group");
            }
        }
    }
}

/// Result of a supervised run that was not refused at start
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub cancelled: bool,
    pub stderr_tail: Vec<String>,
}

impl ProcessOutcome {
    /// Captured stderr tail joined for error messages
    pub fn diagnostic(&self) -> String {
        self.stderr_tail.join("\n")
    }
}

/// Output of a short one-shot invocation
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Owns at most one live [`ProcessHandle`]
#[derive(Debug, Default)]
pub struct ProcessSupervisor {
    current: Mutex<Option<Arc<ProcessHandle>>>,
}

/// Clears the slot exactly once, killing the group if the child was never reaped
struct SlotGuard<'a> {
    supervisor: &'a ProcessSupervisor,
    handle: Arc<ProcessHandle>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        // Dropped mid-run (future cancelled or panic)
        if self.handle.pid().is_some() {
            self.handle.terminate();
        }
        self.supervisor.lock().take();
    }
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<ProcessHandle>>> {
        // A poisoned slot still holds a valid Option
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Cancel the live process; returns false (and does nothing) when idle
    pub fn cancel(&self) -> bool {
        let handle = self.lock().clone();
        match handle {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => {
                debug!("Cancel requested with no live process");
                false
            }
        }
    }

    fn reserve(&self, program: String) -> Result<SlotGuard<'_>, SupervisorError> {
        let mut slot = self.lock();
        if slot.is_some() {
            return Err(SupervisorError::Busy);
        }
        let handle = Arc::new(ProcessHandle::new(program));
        *slot = Some(Arc::clone(&handle));
        drop(slot);

        Ok(SlotGuard {
            supervisor: self,
            handle,
        })
    }

    /// Run `tool` to completion, handing every output line to `on_line` in the
    /// order it was read. The cancellation flag is checked after every line.
    pub async fn run<S, F>(
        &self,
        tool: &ToolCommand,
        args: &[S],
        mut on_line: F,
    ) -> Result<ProcessOutcome, SupervisorError>
    where
        S: AsRef<OsStr>,
        F: FnMut(&OutputLine),
    {
        let guard = self.reserve(tool.display_name())?;
        let handle = Arc::clone(&guard.handle);

        let mut command = tokio::process::Command::from(tool.std_command(args));
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| tool.spawn_error(e))?;
        let pid = child.id().unwrap_or_default();
        info!(program = %handle.program(), pid, "Started external tool");
        handle.attach(pid);

        let io_error = |source: std::io::Error| SupervisorError::Io {
            program: tool.program.display().to_string(),
            source,
        };
        let missing_pipe =
            || io_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "child pipe missing"));

        let stdout = child.stdout.take().ok_or_else(missing_pipe)?;
        let stderr = child.stderr.take().ok_or_else(missing_pipe)?;
        let mut stdout_lines = Some(LineReader::new(BufReader::new(stdout)));
        let mut stderr_lines = Some(LineReader::new(BufReader::new(stderr)));
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        while (stdout_lines.is_some() || stderr_lines.is_some()) && !handle.is_cancelled() {
            let (from_stderr, next) = tokio::select! {
                next = next_line(&mut stdout_lines), if stdout_lines.is_some() => (false, next),
                next = next_line(&mut stderr_lines), if stderr_lines.is_some() => (true, next),
            };

            let line = match next {
                Ok(Some(text)) => text,
                Ok(None) => {
                    close(from_stderr, &mut stdout_lines, &mut stderr_lines);
                    continue;
                }
                Err(e) => {
                    warn!(program = %handle.program(), error = %e, "Stopped reading tool output");
                    close(from_stderr, &mut stdout_lines, &mut stderr_lines);
                    continue;
                }
            };

            let line = if from_stderr {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.clone());
                OutputLine::Stderr(line)
            } else {
                OutputLine::Stdout(line)
            };
            trace!(program = %handle.program(), stderr = line.is_stderr(), line = line.text());
            on_line(&line);
        }

        let cancelled = handle.is_cancelled();
        if cancelled {
            handle.terminate();
        }

        let status = child.wait().await.map_err(io_error)?;
        handle.detach();
        drop(guard);

        let outcome = ProcessOutcome {
            exit_code: status.code(),
            success: status.success() && !cancelled,
            cancelled,
            stderr_tail: tail.into_iter().collect(),
        };
        info!(
            program = %tool.display_name(),
            pid,
            exit_code = ?outcome.exit_code,
            cancelled,
            "External tool exited"
        );
        Ok(outcome)
    }
}

async fn next_line<R>(reader: &mut Option<LineReader<R>>) -> std::io::Result<Option<String>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    match reader {
        Some(reader) => reader.next_line().await,
        None => Ok(None),
    }
}

fn close<A, B>(from_stderr: bool, stdout: &mut Option<A>, stderr: &mut Option<B>) {
    if from_stderr {
        *stderr = None;
    } else {
        *stdout = None;
    }
}

/// Run a short-lived tool invocation and collect its output
pub async fn capture<S: AsRef<OsStr>>(
    tool: &ToolCommand,
    args: &[S],
) -> Result<CapturedOutput, SupervisorError> {
    let mut command = tokio::process::Command::from(tool.std_command(args));
    command.stdin(Stdio::null()).kill_on_drop(true);

    debug!(program = %tool.display_name(), "Capturing tool output");
    let output = command.output().await.map_err(|e| tool.spawn_error(e))?;

    Ok(CapturedOutput {
        exit_code: output.status.code(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Last `max` non-empty lines of `text`
pub fn tail_lines(text: &str, max: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max);
    lines[start..].join("\n")
}
