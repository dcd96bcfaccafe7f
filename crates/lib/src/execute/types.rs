//! Error and result types for target execution.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::CompileCache;
use crate::process::ProcessError;
use crate::target::{BuildStatus, StatusError};
use crate::toolchain::CommandError;
use crate::util::fs::FsError;
use crate::util::hash::HashError;

/// Errors that stop a target pipeline outright.
///
/// A compiler or archiver exiting non-zero is not one of these; it shows up
/// as [`BuildStatus::CompletedFailed`] in the [`TargetOutcome`].
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("target '{target}': no source files match {patterns:?}")]
  NoSources { target: String, patterns: Vec<String> },

  #[error("target '{target}': {first} and {second} both compile to {object}")]
  ObjectCollision {
    target: String,
    object: PathBuf,
    first: PathBuf,
    second: PathBuf,
  },

  #[error(transparent)]
  Status(#[from] StatusError),

  #[error(transparent)]
  Command(#[from] CommandError),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error(transparent)]
  Fs(#[from] FsError),

  #[error(transparent)]
  Hash(#[from] HashError),
}

/// What one target pipeline did.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
  pub name: String,
  pub status: BuildStatus,
  /// Entries for every object of this target, compiled or reused.
  pub cache: CompileCache,
  pub compiled: usize,
  pub cached: usize,
  pub evicted: usize,
  /// The archiver ran.
  pub archived: bool,
  pub elapsed: Duration,
}

impl TargetOutcome {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      status: BuildStatus::NotLaunched,
      cache: CompileCache::new(),
      compiled: 0,
      cached: 0,
      evicted: 0,
      archived: false,
      elapsed: Duration::ZERO,
    }
  }

  pub fn succeeded(&self) -> bool {
    self.status.is_success()
  }
}
