//! Child process launching and batch waiting.
//!
//! Commands are full command lines and run through the platform shell, the
//! same way a user would type them. The environment and stderr are inherited
//! so compiler diagnostics reach the terminal unchanged.
//!
//! The engine only ever observes a small state machine per process:
//! not launched, launched, or completed with success or failure.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Lifecycle of a launched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
  NotLaunched,
  Launched,
  CompletedSuccess,
  CompletedFailed,
}

impl ProcessStatus {
  pub fn is_completed(self) -> bool {
    matches!(self, Self::CompletedSuccess | Self::CompletedFailed)
  }
}

/// Whether [`launch`] waits for the child to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
  Wait,
  NoWait,
}

#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("failed to spawn `{cmd}`: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to wait for `{cmd}`: {source}")]
  Wait {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to open {path} for stdout redirection: {source}")]
  Redirect {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A handle to one command, launched or not.
#[derive(Debug)]
pub struct ProcessHandle {
  cmd: String,
  status: ProcessStatus,
  child: Option<Child>,
}

impl ProcessHandle {
  /// A handle for work that was decided not to run but counts as done.
  pub fn completed(cmd: impl Into<String>, success: bool) -> Self {
    Self {
      cmd: cmd.into(),
      status: if success {
        ProcessStatus::CompletedSuccess
      } else {
        ProcessStatus::CompletedFailed
      },
      child: None,
    }
  }

  pub fn status(&self) -> ProcessStatus {
    self.status
  }

  /// Wait for the child to exit. Completed handles return immediately.
  pub async fn wait(&mut self) -> Result<ProcessStatus, ProcessError> {
    if let Some(mut child) = self.child.take() {
      let exit = child.wait().await.map_err(|source| ProcessError::Wait {
        cmd: self.cmd.clone(),
        source,
      })?;

      self.status = if exit.success() {
        ProcessStatus::CompletedSuccess
      } else {
        warn!(cmd = %self.cmd, code = ?exit.code(), "command failed");
        ProcessStatus::CompletedFailed
      };
    }
    Ok(self.status)
  }
}

/// Launch a command line.
///
/// With [`LaunchMode::Wait`] the returned handle is already completed; with
/// [`LaunchMode::NoWait`] it is `Launched` and must be awaited through
/// [`ProcessHandle::wait`] or [`wait_all`]. When `stdout` is given, the child's
/// standard output is written to that file (truncating it).
pub async fn launch(cmd: &str, mode: LaunchMode, stdout: Option<&Path>) -> Result<ProcessHandle, ProcessError> {
  let (shell, shell_args) = get_shell();

  let mut command = Command::new(shell);
  command.args(shell_args).arg(cmd).stdin(Stdio::null());

  if let Some(path) = stdout {
    let file = std::fs::File::create(path).map_err(|source| ProcessError::Redirect {
      path: path.to_path_buf(),
      source,
    })?;
    command.stdout(Stdio::from(file));
  }

  debug!(cmd = %cmd, ?mode, "spawning process");

  let child = command.spawn().map_err(|source| ProcessError::Spawn {
    cmd: cmd.to_string(),
    source,
  })?;

  let mut handle = ProcessHandle {
    cmd: cmd.to_string(),
    status: ProcessStatus::Launched,
    child: Some(child),
  };

  if mode == LaunchMode::Wait {
    handle.wait().await?;
  }

  Ok(handle)
}

/// Wait for every handle in the batch.
///
/// All handles are awaited even after one fails; there is no early abort of
/// siblings. Returns `true` iff every handle completed successfully. An empty
/// batch is a success.
pub async fn wait_all(handles: &mut [ProcessHandle]) -> Result<bool, ProcessError> {
  let mut all_ok = true;
  for handle in handles.iter_mut() {
    if handle.wait().await? != ProcessStatus::CompletedSuccess {
      all_ok = false;
    }
  }
  Ok(all_ok)
}

/// Shell program and the argument that introduces a command string.
fn get_shell() -> (&'static str, &'static [&'static str]) {
  #[cfg(unix)]
  {
    ("/bin/sh", &["-c"])
  }

  #[cfg(windows)]
  {
    ("cmd.exe", &["/C"])
  }
}
