//! Filesystem and path helpers used by the build pipeline.
//!
//! Everything here is synchronous; the files involved are small and the calls
//! happen between the process barriers of a pipeline, never inside them.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum FsError {
  #[error("io error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid glob pattern '{pattern}': {message}")]
  Pattern { pattern: String, message: String },

  #[error("path is not valid UTF-8: {0}")]
  NonUtf8Path(PathBuf),
}

impl FsError {
  pub(crate) fn io(path: &Path, source: io::Error) -> Self {
    FsError::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

/// True if `path` is missing, is not a directory, or is a directory with no entries.
pub fn is_missing_or_empty(path: &Path) -> bool {
  match fs::read_dir(path) {
    Ok(mut entries) => entries.next().is_none(),
    Err(_) => true,
  }
}

/// Create a directory and all of its parents.
pub fn ensure_dir(path: &Path) -> Result<(), FsError> {
  fs::create_dir_all(path).map_err(|e| FsError::io(path, e))
}

/// Expand glob patterns relative to `base` into a list of files.
///
/// Each pattern's matches come back in the order `glob` yields them (sorted),
/// patterns are processed in the order given, and a file matched by more than
/// one pattern appears only once, at its first position. Directories are skipped.
pub fn expand_globs(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, FsError> {
  let escaped_base = glob::Pattern::escape(path_str(base)?);

  let mut seen = HashSet::new();
  let mut files = Vec::new();

  for pattern in patterns {
    let full = Path::new(&escaped_base).join(pattern);
    let paths = glob::glob(path_str(&full)?).map_err(|e| FsError::Pattern {
      pattern: pattern.clone(),
      message: e.to_string(),
    })?;

    for entry in paths {
      let path = entry.map_err(|e| {
        let path = e.path().to_path_buf();
        FsError::io(&path, e.into())
      })?;
      if path.is_file() && seen.insert(path.clone()) {
        files.push(path);
      }
    }
  }

  Ok(files)
}

/// List the regular files directly inside `dir`, sorted by name.
///
/// A missing directory yields an empty list.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, FsError> {
  if !dir.exists() {
    return Ok(Vec::new());
  }

  let mut files = Vec::new();
  for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
    let entry = entry.map_err(|e| {
      let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
      FsError::Io {
        path,
        source: e.into_io_error().unwrap_or_else(|| io::Error::other("directory walk failed")),
      }
    })?;
    if entry.file_type().is_file() {
      files.push(entry.into_path());
    }
  }
  Ok(files)
}

/// Remove every entry inside `dir`, keeping the directory itself.
pub fn clear_dir(dir: &Path) -> Result<(), FsError> {
  if !dir.exists() {
    return Ok(());
  }
  let entries = fs::read_dir(dir).map_err(|e| FsError::io(dir, e))?;
  for entry in entries {
    let path = entry.map_err(|e| FsError::io(dir, e))?.path();
    let result = if path.is_dir() {
      fs::remove_dir_all(&path)
    } else {
      fs::remove_file(&path)
    };
    result.map_err(|e| FsError::io(&path, e))?;
  }
  Ok(())
}

/// Remove a file, treating "not found" as success.
///
/// Returns whether a file was actually removed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool, FsError> {
  match fs::remove_file(path) {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(FsError::io(path, e)),
  }
}

/// Modification time of `path`, or `None` if it does not exist.
pub fn modified(path: &Path) -> Result<Option<SystemTime>, FsError> {
  match fs::metadata(path) {
    Ok(meta) => meta.modified().map(Some).map_err(|e| FsError::io(path, e)),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(FsError::io(path, e)),
  }
}

/// Latest modification time across `paths`.
///
/// Every path must exist; a missing one is an error because the caller
/// expects to be looking at files it just produced.
pub fn latest_modified<'a, I>(paths: I) -> Result<Option<SystemTime>, FsError>
where
  I: IntoIterator<Item = &'a PathBuf>,
{
  let mut latest: Option<SystemTime> = None;
  for path in paths {
    let time = fs::metadata(path)
      .and_then(|m| m.modified())
      .map_err(|e| FsError::io(path, e))?;
    latest = Some(latest.map_or(time, |l| l.max(time)));
  }
  Ok(latest)
}

/// Replace every exact occurrence of `pattern` in a text file.
///
/// Returns the number of replacements made. The file is only rewritten when
/// at least one occurrence was found.
pub fn replace_in_file(path: &Path, pattern: &str, replacement: &str) -> Result<usize, FsError> {
  let content = fs::read_to_string(path).map_err(|e| FsError::io(path, e))?;
  let count = content.matches(pattern).count();
  if count > 0 {
    fs::write(path, content.replace(pattern, replacement)).map_err(|e| FsError::io(path, e))?;
  }
  Ok(count)
}

/// `<dir>/<file name of input with its extension replaced by ext>`.
pub fn derived_path(dir: &Path, input: &Path, ext: &str) -> PathBuf {
  let name = input.file_name().map(PathBuf::from).unwrap_or_default();
  dir.join(name.with_extension(ext))
}

/// Borrow a path as UTF-8, as needed to splice it into a command line.
pub fn path_str(path: &Path) -> Result<&str, FsError> {
  path.to_str().ok_or_else(|| FsError::NonUtf8Path(path.to_path_buf()))
}

/// True if `path` has exactly the extension `ext`.
pub fn has_extension(path: &Path, ext: &str) -> bool {
  path.extension().is_some_and(|e| e == ext)
}
