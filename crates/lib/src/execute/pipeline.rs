//! The per-target build pipeline.
//!
//! ```text
//! expand globs ─► preprocess all ─► hash + decide ─► compile misses ─► evict ─► archive
//!                 (one batch)                         (one batch)
//! ```
//!
//! Staleness is decided on the preprocessed output, so a change to any
//! included header recompiles exactly the objects that see it. The compile
//! command itself is part of the key, so a flag or mode change does too.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info};

use crate::consts::OBJ_EXT;
use crate::process::{self, LaunchMode, ProcessStatus};
use crate::project::Project;
use crate::target::LibraryTarget;
use crate::toolchain::{archive_command, synthesize};
use crate::util::fs::{
  derived_path, ensure_dir, expand_globs, has_extension, latest_modified, list_files, modified, path_str,
  remove_file_if_exists,
};
use crate::util::hash::hash_file;

use super::types::{PipelineError, TargetOutcome};

/// Expand a target's source globs into its input files.
///
/// Fails when nothing matches, or when two inputs would share an object file.
pub fn expand_sources(target: &LibraryTarget) -> Result<Vec<PathBuf>, PipelineError> {
  let inputs = expand_globs(&target.source_dir, &target.sources)?;
  if inputs.is_empty() {
    return Err(PipelineError::NoSources {
      target: target.name.clone(),
      patterns: target.sources.clone(),
    });
  }

  let mut owners: HashMap<PathBuf, &PathBuf> = HashMap::new();
  for input in &inputs {
    let object = derived_path(&target.object_dir, input, OBJ_EXT);
    if let Some(first) = owners.insert(object.clone(), input) {
      return Err(PipelineError::ObjectCollision {
        target: target.name.clone(),
        object,
        first: first.clone(),
        second: input.clone(),
      });
    }
  }

  Ok(inputs)
}

/// Build one target from already expanded `inputs`.
///
/// The target's status moves to launched and then to a completed state. A
/// failing compiler or archiver completes it as failed and is reported in
/// the outcome; anything else aborts with an error.
pub async fn build_target(
  project: &Project,
  target: &mut LibraryTarget,
  inputs: &[PathBuf],
) -> Result<TargetOutcome, PipelineError> {
  target.status.launch()?;

  let start = Instant::now();
  let mut outcome = TargetOutcome::new(&target.name);

  let result = run_stages(project, target, inputs, &mut outcome).await;
  let success = matches!(result, Ok(true));
  target.status.complete(success)?;
  result?;

  outcome.status = target.status;
  outcome.elapsed = start.elapsed();

  if success {
    info!(
      library = %target.name,
      compiled = outcome.compiled,
      cached = outcome.cached,
      elapsed_ms = outcome.elapsed.as_millis() as u64,
      "compile step"
    );
  } else {
    error!(library = %target.name, "target failed");
  }

  Ok(outcome)
}

/// Returns `Ok(false)` as soon as a stage's processes fail.
async fn run_stages(
  project: &Project,
  target: &LibraryTarget,
  inputs: &[PathBuf],
  outcome: &mut TargetOutcome,
) -> Result<bool, PipelineError> {
  let settings = project.settings();
  let object_dir = &target.object_dir;
  ensure_dir(object_dir)?;

  let existing = existing_objects(object_dir)?;

  // Preprocess
  let preprocessed: Vec<PathBuf> = inputs
    .iter()
    .map(|input| derived_path(object_dir, input, target.lang.preprocessed_ext()))
    .collect();

  let mut handles = Vec::with_capacity(inputs.len());
  for (input, output) in inputs.iter().zip(&preprocessed) {
    let cmd = synthesize(settings, &target.flags, path_str(input)?, path_str(output)?, "")?;
    debug!(library = %target.name, cmd = %cmd, "preprocess");
    handles.push(process::launch(&cmd, LaunchMode::NoWait, None).await?);
  }
  if !process::wait_all(&mut handles).await? {
    error!(library = %target.name, "preprocessing failed");
    return Ok(false);
  }

  // Decide and compile
  let mut objects = Vec::with_capacity(inputs.len());
  let mut handles = Vec::new();
  for (input, preprocessed) in inputs.iter().zip(&preprocessed) {
    let object = derived_path(object_dir, input, OBJ_EXT);
    let hash = hash_file(preprocessed)?;
    let cmd = synthesize(settings, &target.flags, path_str(input)?, path_str(&object)?, "")?;

    let hit = project.previous_cache.is_hit(&object, &cmd, hash);
    outcome.cache.record(object.clone(), cmd.clone(), hash);

    if hit {
      debug!(library = %target.name, object = %object.display(), "skip compile");
      outcome.cached += 1;
    } else {
      debug!(library = %target.name, cmd = %cmd, "compile");
      handles.push(process::launch(&cmd, LaunchMode::NoWait, None).await?);
      outcome.compiled += 1;
    }
    objects.push(object);
  }
  if !process::wait_all(&mut handles).await? {
    error!(library = %target.name, "compilation failed");
    return Ok(false);
  }

  outcome.evicted = evict_unclaimed(&existing, &objects)?;

  archive(project, target, &objects, outcome).await
}

/// Object files left in `dir` by earlier runs. Anything else there is a
/// leftover preprocessed file and is removed.
fn existing_objects(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
  let mut objects = Vec::new();
  for file in list_files(dir)? {
    if has_extension(&file, OBJ_EXT) {
      objects.push(file);
    } else {
      remove_file_if_exists(&file)?;
    }
  }
  Ok(objects)
}

fn evict_unclaimed(existing: &[PathBuf], claimed: &[PathBuf]) -> Result<usize, PipelineError> {
  let claimed: HashSet<&PathBuf> = claimed.iter().collect();
  let mut evicted = 0;
  for object in existing.iter().filter(|o| !claimed.contains(o)) {
    if remove_file_if_exists(object)? {
      info!(object = %object.display(), "removed stale object");
      evicted += 1;
    }
  }
  Ok(evicted)
}

/// Re-archive when any object is newer than the archive, or when an object
/// was evicted and would otherwise survive inside the old archive.
async fn archive(
  project: &Project,
  target: &LibraryTarget,
  objects: &[PathBuf],
  outcome: &mut TargetOutcome,
) -> Result<bool, PipelineError> {
  let newest_object = latest_modified(objects)?;
  let archive_time = modified(&target.archive_path)?;

  let stale = match (newest_object, archive_time) {
    _ if outcome.evicted > 0 => true,
    (Some(object), Some(archive)) => object > archive,
    (_, None) => true,
    (None, Some(_)) => false,
  };
  if !stale {
    info!(library = %target.name, "skip lib");
    return Ok(true);
  }

  remove_file_if_exists(&target.archive_path)?;

  let objects = objects
    .iter()
    .map(|o| path_str(o).map(str::to_string))
    .collect::<Result<Vec<_>, _>>()?;
  let cmd = archive_command(project.backend, path_str(&target.archive_path)?, &objects);
  debug!(library = %target.name, cmd = %cmd, "archive");

  let handle = process::launch(&cmd, LaunchMode::Wait, None).await?;
  outcome.archived = true;
  if handle.status() != ProcessStatus::CompletedSuccess {
    error!(library = %target.name, "archiving failed");
    return Ok(false);
  }
  Ok(true)
}
