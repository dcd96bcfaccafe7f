//! Cross-target job scheduling.
//!
//! Every target becomes a `Job`. Sources for all jobs are expanded before
//! any job starts, so a configuration mistake in the last target stops the
//! run before the first compiler is launched.
//!
//! In parallel mode each job is its own task; in serial mode jobs run one
//! after another in declaration order. Either way each job fills a private
//! cache, and the caches are merged in declaration order once all jobs have
//! finished.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::cache::CompileCache;
use crate::consts::SERIAL_ENV;
use crate::platform::debugger_attached;
use crate::project::Project;
use crate::target::LibraryTarget;

use super::pipeline::{build_target, expand_sources};
use super::types::{PipelineError, TargetOutcome};

/// How jobs are run relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
  Parallel,
  Serial,
}

impl ExecMode {
  /// Serial when forced through the environment or when a debugger is attached.
  pub fn detect() -> Self {
    if serial_requested() {
      info!(env = SERIAL_ENV, "serial execution requested");
      Self::Serial
    } else if debugger_attached() {
      info!("debugger attached, running jobs serially");
      Self::Serial
    } else {
      Self::Parallel
    }
  }

  /// Runtime worker threads needed for `jobs` jobs.
  pub fn worker_threads(self, jobs: usize) -> usize {
    match self {
      Self::Parallel => jobs.max(1),
      Self::Serial => 1,
    }
  }
}

fn serial_requested() -> bool {
  std::env::var(SERIAL_ENV).is_ok_and(|v| !v.is_empty() && v != "0")
}

/// One target and its expanded inputs. Runs once.
#[derive(Debug)]
struct Job {
  target: LibraryTarget,
  inputs: Vec<PathBuf>,
}

impl Job {
  fn new(target: LibraryTarget) -> Result<Self, PipelineError> {
    let inputs = expand_sources(&target)?;
    Ok(Self { target, inputs })
  }

  async fn run(mut self, project: Arc<Project>) -> (LibraryTarget, Result<TargetOutcome, PipelineError>) {
    let result = build_target(&project, &mut self.target, &self.inputs).await;
    (self.target, result)
  }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
  #[error("target '{target}': {source}")]
  Pipeline {
    target: String,
    #[source]
    source: PipelineError,
  },

  #[error("worker for target '{target}' panicked: {message}")]
  WorkerPanicked { target: String, message: String },

  #[error("failed targets: {}", .0.join(", "))]
  TargetsFailed(Vec<String>),
}

/// Everything the jobs produced, in declaration order.
#[derive(Debug, Default)]
pub struct ScheduleReport {
  pub targets: Vec<LibraryTarget>,
  pub outcomes: Vec<TargetOutcome>,
  /// Merge of every job's cache.
  pub cache: CompileCache,
}

impl ScheduleReport {
  /// Fails if any target completed as failed.
  pub fn ensure_all_succeeded(&self) -> Result<(), ScheduleError> {
    let failed: Vec<String> = self
      .outcomes
      .iter()
      .filter(|o| !o.succeeded())
      .map(|o| o.name.clone())
      .collect();

    if failed.is_empty() {
      Ok(())
    } else {
      Err(ScheduleError::TargetsFailed(failed))
    }
  }
}

type JobResult = (LibraryTarget, Result<TargetOutcome, PipelineError>);

/// Build every target and wait for all of them.
///
/// Returns an error for a configuration or I/O problem in any job, or a
/// panicked worker. Targets whose toolchain failed are reported in the
/// outcomes; use [`ScheduleReport::ensure_all_succeeded`] to reject them.
pub async fn run_jobs(
  project: Arc<Project>,
  targets: Vec<LibraryTarget>,
  mode: ExecMode,
) -> Result<ScheduleReport, ScheduleError> {
  let jobs = targets
    .into_iter()
    .map(|target| {
      let name = target.name.clone();
      Job::new(target).map_err(|source| ScheduleError::Pipeline { target: name, source })
    })
    .collect::<Result<Vec<_>, _>>()?;

  let names: Vec<String> = jobs.iter().map(|j| j.target.name.clone()).collect();
  info!(jobs = jobs.len(), ?mode, "running targets");

  let results: Vec<Result<JobResult, String>> = match mode {
    ExecMode::Serial => {
      let mut results = Vec::with_capacity(jobs.len());
      for job in jobs {
        results.push(Ok(job.run(project.clone()).await));
      }
      results
    }
    ExecMode::Parallel => {
      let handles: Vec<_> = jobs
        .into_iter()
        .map(|job| tokio::spawn(job.run(project.clone())))
        .collect();

      let mut results = Vec::with_capacity(handles.len());
      for handle in handles {
        results.push(handle.await.map_err(|e| e.to_string()));
      }
      results
    }
  };

  let mut report = ScheduleReport::default();
  for (name, result) in names.into_iter().zip(results) {
    let (target, outcome) = result.map_err(|message| {
      error!(library = %name, %message, "worker panicked");
      ScheduleError::WorkerPanicked {
        target: name.clone(),
        message,
      }
    })?;
    let mut outcome = outcome.map_err(|source| ScheduleError::Pipeline { target: name, source })?;

    report.cache.merge(std::mem::take(&mut outcome.cache));
    report.targets.push(target);
    report.outcomes.push(outcome);
  }

  Ok(report)
}
