//! The compile cache.
//!
//! Maps an object file to the command that produced it and the hash of the
//! preprocessed source it was compiled from. An object is reused only when
//! both still match what a rebuild would use now.
//!
//! The previous run's cache is loaded once and only read; each pipeline fills
//! its own cache, and the driver merges them and saves the result after a
//! successful run.

pub mod format;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::util::hash::PreprocessedHash;

pub use format::FormatError;

/// What produced an object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
  pub command: String,
  pub hash: PreprocessedHash,
}

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("failed to read compile cache {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write compile cache {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to encode compile cache: {0}")]
  Encode(#[source] FormatError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileCache {
  entries: BTreeMap<PathBuf, CacheEntry>,
}

impl CompileCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load a cache file.
  ///
  /// A missing or malformed file yields an empty cache. Only a read failure
  /// other than "not found" is an error.
  pub fn load(path: &Path) -> Result<Self, CacheError> {
    let bytes = match fs::read(path) {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no compile cache, starting empty");
        return Ok(Self::new());
      }
      Err(source) => {
        return Err(CacheError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    let Ok(content) = String::from_utf8(bytes) else {
      warn!(path = %path.display(), "compile cache is not valid UTF-8, ignoring it");
      return Ok(Self::new());
    };

    match format::parse(&content) {
      Ok(entries) => {
        debug!(path = %path.display(), entries = entries.len(), "loaded compile cache");
        Ok(Self { entries })
      }
      Err(e) => {
        warn!(path = %path.display(), error = %e, "ignoring malformed compile cache");
        Ok(Self::new())
      }
    }
  }

  /// Write the cache, sorted by object path.
  ///
  /// Uses atomic write (write to temp, then rename) so an interrupted save
  /// leaves the previous file intact.
  pub fn save(&self, path: &Path) -> Result<(), CacheError> {
    let write_err = |source| CacheError::Write {
      path: path.to_path_buf(),
      source,
    };

    let content = format::render(&self.entries).map_err(CacheError::Encode)?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, content).map_err(write_err)?;
    fs::rename(&temp_path, path).map_err(write_err)?;

    debug!(path = %path.display(), entries = self.entries.len(), "saved compile cache");
    Ok(())
  }

  pub fn lookup(&self, object: &Path) -> Option<&CacheEntry> {
    self.entries.get(object)
  }

  /// Insert or replace the entry for `object`.
  pub fn record(&mut self, object: impl Into<PathBuf>, command: impl Into<String>, hash: PreprocessedHash) {
    self.entries.insert(
      object.into(),
      CacheEntry {
        command: command.into(),
        hash,
      },
    );
  }

  /// Take every entry of `other`, replacing entries with the same path.
  pub fn merge(&mut self, other: CompileCache) {
    self.entries.extend(other.entries);
  }

  /// True if `object` can be reused for `command` over preprocessed source hashing to `hash`.
  ///
  /// The object must also still exist; an entry whose object was deleted is a miss.
  pub fn is_hit(&self, object: &Path, command: &str, hash: PreprocessedHash) -> bool {
    self
      .lookup(object)
      .is_some_and(|entry| entry.hash == hash && entry.command == command)
      && object.is_file()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
