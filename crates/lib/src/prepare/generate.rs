//! Source generators.
//!
//! Some libraries ship programs that produce lookup tables at build time. A
//! generator compiles such a program for the host, runs it, and captures its
//! standard output into a file inside the source tree.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::platform::exe_extension;
use crate::process::{self, LaunchMode, ProcessError, ProcessStatus};
use crate::project::Project;
use crate::target::LibraryTarget;
use crate::toolchain::{CommandError, synthesize};
use crate::util::fs::{FsError, ensure_dir, path_str};

/// Placeholder in generator arguments for the library's source directory.
pub const SOURCE_DIR_PLACEHOLDER: &str = "{src}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generator {
  /// Program sources, relative to the library's source directory. The
  /// executable is named after the first one.
  pub sources: Vec<PathBuf>,
  /// Compile flags; the library's own flags when absent.
  #[serde(default)]
  pub flags: Option<Vec<String>>,
  #[serde(default)]
  pub args: Vec<String>,
  /// Captured stdout, relative to the library's source directory.
  pub output: PathBuf,
}

#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("generator for '{library}' has no sources")]
  NoSources { library: String },

  #[error("building generator {program} failed")]
  BuildFailed { program: PathBuf },

  #[error("generator {program} failed")]
  RunFailed { program: PathBuf },

  #[error(transparent)]
  Command(#[from] CommandError),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error(transparent)]
  Fs(#[from] FsError),
}

/// Build and run one generator unless its output already exists.
///
/// Returns whether the generator ran.
pub async fn run_generator(
  project: &Project,
  target: &LibraryTarget,
  generator: &Generator,
) -> Result<bool, GenerateError> {
  let output = target.source_dir.join(&generator.output);
  if output.exists() {
    debug!(library = %target.name, output = %output.display(), "generated file exists");
    return Ok(false);
  }

  let first = generator.sources.first().ok_or_else(|| GenerateError::NoSources {
    library: target.name.clone(),
  })?;
  let program = target.source_dir.join(first).with_extension(exe_extension());

  let inputs = generator
    .sources
    .iter()
    .map(|s| path_str(&target.source_dir.join(s)).map(str::to_string))
    .collect::<Result<Vec<_>, _>>()?
    .join(" ");
  let flags = match &generator.flags {
    Some(flags) => flags.join(" "),
    None => target.flags.clone(),
  };

  let build = synthesize(project.settings(), &flags, &inputs, path_str(&program)?, "")?;
  debug!(library = %target.name, cmd = %build, "build generator");
  if process::launch(&build, LaunchMode::Wait, None).await?.status() != ProcessStatus::CompletedSuccess {
    return Err(GenerateError::BuildFailed { program });
  }

  let source_dir = path_str(&target.source_dir)?;
  let mut run = path_str(&program)?.to_string();
  for arg in &generator.args {
    run.push(' ');
    run.push_str(&arg.replace(SOURCE_DIR_PLACEHOLDER, source_dir));
  }

  if let Some(parent) = output.parent() {
    ensure_dir(parent)?;
  }
  info!(library = %target.name, output = %output.display(), "running generator");
  if process::launch(&run, LaunchMode::Wait, Some(&output)).await?.status() != ProcessStatus::CompletedSuccess {
    return Err(GenerateError::RunFailed { program });
  }

  Ok(true)
}
