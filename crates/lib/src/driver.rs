//! End-to-end build of a description.
//!
//! Order of a run:
//!
//! 1. load the description and the previous compile cache
//! 2. fetch missing sources, patch fresh trees, run generators
//! 3. optionally clear object directories
//! 4. build every library target
//! 5. link the executable, if any
//! 6. save the merged compile cache
//!
//! The cache is only written when every step succeeded.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use crate::cache::CacheError;
use crate::description::{Description, DescriptionError};
use crate::execute::{ExecMode, ScheduleError, TargetOutcome, run_jobs};
use crate::link::{LinkError, build_executable};
use crate::prepare::{FetchError, GenerateError, apply_patches, fetch_sources, run_generator};
use crate::project::Project;
use crate::toolchain::{Backend, BuildMode, SelectionError};
use crate::util::fs::{FsError, clear_dir, ensure_dir};

/// Everything that configures one run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  pub backend: Backend,
  pub mode: BuildMode,
  pub description: PathBuf,
  /// Project root; the description's directory when absent.
  pub root_dir: Option<PathBuf>,
  /// Forced execution mode; detected when absent.
  pub exec_mode: Option<ExecMode>,
  /// Delete existing objects first.
  pub clean: bool,
  /// Clone missing sources.
  pub fetch: bool,
}

#[derive(Debug)]
pub struct BuildReport {
  pub out_dir: PathBuf,
  pub outcomes: Vec<TargetOutcome>,
  pub executable: Option<PathBuf>,
  pub cache_entries: usize,
  pub elapsed: Duration,
}

impl BuildReport {
  pub fn compiled(&self) -> usize {
    self.outcomes.iter().map(|o| o.compiled).sum()
  }

  pub fn cached(&self) -> usize {
    self.outcomes.iter().map(|o| o.cached).sum()
  }
}

#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Selection(#[from] SelectionError),

  #[error(transparent)]
  Description(#[from] DescriptionError),

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Generate(#[from] GenerateError),

  #[error(transparent)]
  Schedule(#[from] ScheduleError),

  #[error(transparent)]
  Link(#[from] LinkError),

  #[error(transparent)]
  Fs(#[from] FsError),
}

pub async fn run_build(options: &BuildOptions) -> Result<BuildReport, BuildError> {
  let start = Instant::now();
  options.backend.ensure_host_supported()?;

  let description = Description::load(&options.description)?;
  let root_dir = match &options.root_dir {
    Some(root) => root.clone(),
    None => description_dir(&options.description)?,
  };

  let project = Project::load(&root_dir, options.backend, options.mode)?;
  ensure_dir(&project.out_dir)?;
  info!(
    backend = %project.backend,
    mode = %project.mode,
    out = %project.out_dir.display(),
    "starting build"
  );

  let plans = description.plan(&project);

  if options.fetch {
    let sources: Vec<_> = plans
      .iter()
      .filter_map(|p| p.source.as_ref().map(|s| (&p.target, s)))
      .collect();
    fetch_sources(&sources).await?;

    for plan in &plans {
      apply_patches(&plan.target, &plan.patches)?;
    }
  }

  for plan in &plans {
    for generator in &plan.generators {
      run_generator(&project, &plan.target, generator).await?;
    }
  }

  if options.clean {
    for plan in &plans {
      info!(library = %plan.target.name, "cleaning objects");
      clear_dir(&plan.target.object_dir)?;
    }
  }

  let exec_mode = options.exec_mode.unwrap_or_else(ExecMode::detect);
  let targets = plans.into_iter().map(|p| p.target).collect();
  let project = Arc::new(project);

  let compile_start = Instant::now();
  let schedule = run_jobs(project.clone(), targets, exec_mode).await?;
  schedule.ensure_all_succeeded()?;
  info!(
    elapsed_ms = compile_start.elapsed().as_millis() as u64,
    "total deps compile"
  );

  let mut cache = schedule.cache;
  let executable = match description.executable() {
    Some(executable) => Some(
      build_executable(&project, &executable, &schedule.targets, &mut cache)
        .await?
        .executable,
    ),
    None => None,
  };

  cache.save(&project.cache_path())?;

  let elapsed = start.elapsed();
  info!(elapsed_ms = elapsed.as_millis() as u64, "total");

  Ok(BuildReport {
    out_dir: project.out_dir.clone(),
    outcomes: schedule.outcomes,
    executable,
    cache_entries: cache.len(),
    elapsed,
  })
}

/// Absolute directory holding the description file.
fn description_dir(path: &std::path::Path) -> Result<PathBuf, FsError> {
  let absolute = dunce::canonicalize(path).map_err(|e| FsError::io(path, e))?;
  Ok(absolute.parent().map(PathBuf::from).unwrap_or(absolute))
}
