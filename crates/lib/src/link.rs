//! Linking the host program against the built libraries.
//!
//! The program's single source goes through the same preprocess, hash and
//! cache test as library sources. Its object is then linked with the library
//! archives into `<out>/<stem>.bin` (`.exe` on Windows).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::CompileCache;
use crate::consts::OBJ_EXT;
use crate::platform::exe_extension;
use crate::process::{self, LaunchMode, ProcessError, ProcessStatus};
use crate::project::Project;
use crate::target::{Lang, LibraryTarget, join_flags};
use crate::toolchain::{CommandError, synthesize};
use crate::util::fs::{FsError, derived_path, path_str};
use crate::util::hash::{HashError, hash_file};

/// The final program of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executable {
  /// Relative to the project root.
  pub source: PathBuf,
  #[serde(default)]
  pub lang: Lang,
  #[serde(default)]
  pub flags: String,
  #[serde(default)]
  pub link_flags: String,
  /// Libraries whose include flags come first and whose archives are linked, in link order.
  #[serde(default)]
  pub libraries: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LinkError {
  #[error("executable links unknown library '{0}'")]
  UnknownLibrary(String),

  #[error("preprocessing {0} failed")]
  PreprocessFailed(PathBuf),

  #[error("compiling {0} failed")]
  CompileFailed(PathBuf),

  #[error("linking {0} failed")]
  LinkFailed(PathBuf),

  #[error(transparent)]
  Command(#[from] CommandError),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error(transparent)]
  Fs(#[from] FsError),

  #[error(transparent)]
  Hash(#[from] HashError),
}

#[derive(Debug, Clone)]
pub struct LinkOutcome {
  pub executable: PathBuf,
  /// False when the cached object was reused.
  pub compiled: bool,
}

/// Compile and link the program, recording its object into `cache`.
pub async fn build_executable(
  project: &Project,
  executable: &Executable,
  libraries: &[LibraryTarget],
  cache: &mut CompileCache,
) -> Result<LinkOutcome, LinkError> {
  let linked = executable
    .libraries
    .iter()
    .map(|name| {
      libraries
        .iter()
        .find(|l| &l.name == name)
        .ok_or_else(|| LinkError::UnknownLibrary(name.clone()))
    })
    .collect::<Result<Vec<_>, _>>()?;

  let flags = join_flags(
    linked
      .iter()
      .map(|l| l.include_flag.as_str())
      .chain([executable.flags.as_str()]),
  );

  let settings = project.settings();
  let source = project.resolve(&executable.source);
  let preprocessed = derived_path(&project.out_dir, &source, executable.lang.preprocessed_ext());
  let object = derived_path(&project.out_dir, &source, OBJ_EXT);
  let output = derived_path(&project.out_dir, &source, exe_extension());

  let cmd = synthesize(settings, &flags, path_str(&source)?, path_str(&preprocessed)?, "")?;
  debug!(cmd = %cmd, "preprocess");
  let mut handle = process::launch(&cmd, LaunchMode::NoWait, None).await?;
  if handle.wait().await? != ProcessStatus::CompletedSuccess {
    return Err(LinkError::PreprocessFailed(source));
  }

  let hash = hash_file(&preprocessed)?;
  let cmd = synthesize(settings, &flags, path_str(&source)?, path_str(&object)?, "")?;
  let hit = project.previous_cache.is_hit(&object, &cmd, hash);
  cache.record(object.clone(), cmd.clone(), hash);

  if hit {
    info!(object = %object.display(), "skip compile");
  } else {
    debug!(cmd = %cmd, "compile");
    if process::launch(&cmd, LaunchMode::Wait, None).await?.status() != ProcessStatus::CompletedSuccess {
      return Err(LinkError::CompileFailed(source));
    }
  }

  let mut inputs = vec![path_str(&object)?.to_string()];
  for library in &linked {
    inputs.push(path_str(&library.archive_path)?.to_string());
  }
  let cmd = synthesize(
    settings,
    &flags,
    &inputs.join(" "),
    path_str(&output)?,
    &executable.link_flags,
  )?;
  debug!(cmd = %cmd, "link");
  if process::launch(&cmd, LaunchMode::Wait, None).await?.status() != ProcessStatus::CompletedSuccess {
    return Err(LinkError::LinkFailed(output));
  }

  info!(executable = %output.display(), "linked");
  Ok(LinkOutcome {
    executable: output,
    compiled: !hit,
  })
}
