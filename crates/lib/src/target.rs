//! Static library targets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{PREPROCESSED_C_EXT, PREPROCESSED_CPP_EXT};
use crate::platform::archive_extension;
use crate::project::Project;
use crate::util::fs::is_missing_or_empty;

/// Source language, which decides the preprocessed file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
  #[default]
  C,
  Cpp,
}

impl Lang {
  pub fn preprocessed_ext(self) -> &'static str {
    match self {
      Self::C => PREPROCESSED_C_EXT,
      Self::Cpp => PREPROCESSED_CPP_EXT,
    }
  }
}

/// Build progress of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildStatus {
  #[default]
  NotLaunched,
  Launched,
  CompletedSuccess,
  CompletedFailed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusError {
  #[error("target was already launched")]
  AlreadyLaunched,

  #[error("target was never launched")]
  NotLaunched,

  #[error("target has already completed")]
  AlreadyCompleted,
}

impl BuildStatus {
  pub fn launch(&mut self) -> Result<(), StatusError> {
    match self {
      Self::NotLaunched => {
        *self = Self::Launched;
        Ok(())
      }
      _ => Err(StatusError::AlreadyLaunched),
    }
  }

  pub fn complete(&mut self, success: bool) -> Result<(), StatusError> {
    match self {
      Self::Launched => {
        *self = if success {
          Self::CompletedSuccess
        } else {
          Self::CompletedFailed
        };
        Ok(())
      }
      Self::NotLaunched => Err(StatusError::NotLaunched),
      Self::CompletedSuccess | Self::CompletedFailed => Err(StatusError::AlreadyCompleted),
    }
  }

  pub fn is_completed(self) -> bool {
    matches!(self, Self::CompletedSuccess | Self::CompletedFailed)
  }

  pub fn is_success(self) -> bool {
    self == Self::CompletedSuccess
  }
}

/// One static library built from a list of source globs.
#[derive(Debug, Clone)]
pub struct LibraryTarget {
  pub name: String,
  pub lang: Lang,
  /// `<root>/<name>`, where sources are fetched to.
  pub source_dir: PathBuf,
  /// `<out>/<name>`, holding objects and preprocessed files.
  pub object_dir: PathBuf,
  /// `<out>/<name>.a` (`.lib` on Windows).
  pub archive_path: PathBuf,
  pub include_dir: PathBuf,
  /// `-I<include dir>`
  pub include_flag: String,
  /// Own flags, own include flag, then dependency include flags.
  pub flags: String,
  /// Glob patterns relative to `source_dir`.
  pub sources: Vec<String>,
  /// The source directory was absent or empty when the target was created.
  pub freshly_fetched: bool,
  pub status: BuildStatus,
}

impl LibraryTarget {
  /// `include_dir` is relative to the target's source directory.
  pub fn new(project: &Project, name: &str, lang: Lang, include_dir: &Path, flags: &str, sources: Vec<String>) -> Self {
    let source_dir = project.source_dir(name);
    let include_dir = source_dir.join(include_dir);
    let include_flag = format!("-I{}", include_dir.display());
    let flags = join_flags([flags, include_flag.as_str()]);

    Self {
      name: name.to_string(),
      lang,
      freshly_fetched: is_missing_or_empty(&source_dir),
      object_dir: project.object_dir(name),
      archive_path: project.out_dir.join(format!("{name}.{}", archive_extension())),
      source_dir,
      include_dir,
      include_flag,
      flags,
      sources,
      status: BuildStatus::NotLaunched,
    }
  }

  /// Let this target see another target's headers.
  pub fn add_include_of(&mut self, other: &LibraryTarget) {
    self.flags = join_flags([self.flags.as_str(), other.include_flag.as_str()]);
  }
}

/// Join non-empty flag fragments with single spaces.
pub(crate) fn join_flags<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
  parts
    .into_iter()
    .map(str::trim)
    .filter(|p| !p.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::toolchain::{Backend, BuildMode};

  fn project() -> Project {
    Project::new("/work", Backend::Gcc, BuildMode::Debug)
  }

  #[test]
  fn status_transitions() {
    let mut status = BuildStatus::default();
    assert_eq!(status.complete(true), Err(StatusError::NotLaunched));

    status.launch().unwrap();
    assert_eq!(status.launch(), Err(StatusError::AlreadyLaunched));

    status.complete(false).unwrap();
    assert_eq!(status, BuildStatus::CompletedFailed);
    assert!(status.is_completed());
    assert!(!status.is_success());
    assert_eq!(status.complete(true), Err(StatusError::AlreadyCompleted));
    assert_eq!(status.launch(), Err(StatusError::AlreadyLaunched));
  }

  #[test]
  fn target_layout_and_flags() {
    let target = LibraryTarget::new(
      &project(),
      "freetype",
      Lang::C,
      Path::new("include"),
      "-DFT2_BUILD_LIBRARY",
      vec!["src/base/*.c".to_string()],
    );

    assert_eq!(target.source_dir, PathBuf::from("/work/freetype"));
    assert_eq!(target.object_dir, PathBuf::from("/work/build-gcc-debug/freetype"));
    assert_eq!(target.include_flag, "-I/work/freetype/include");
    assert_eq!(target.flags, "-DFT2_BUILD_LIBRARY -I/work/freetype/include");
    assert!(target.freshly_fetched);
    assert_eq!(target.status, BuildStatus::NotLaunched);
    if cfg!(unix) {
      assert_eq!(target.archive_path, PathBuf::from("/work/build-gcc-debug/freetype.a"));
    }
  }

  #[test]
  fn dependency_include_flags_are_appended() {
    let project = project();
    let mut freetype = LibraryTarget::new(&project, "freetype", Lang::C, Path::new("include"), "", vec![]);
    let harfbuzz = LibraryTarget::new(&project, "harfbuzz", Lang::Cpp, Path::new("src"), "-DHAVE_FREETYPE", vec![]);

    freetype.add_include_of(&harfbuzz);
    assert_eq!(freetype.flags, "-I/work/freetype/include -I/work/harfbuzz/src");
    assert_eq!(harfbuzz.lang.preprocessed_ext(), "ii");
  }
}
