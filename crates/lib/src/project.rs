//! Project-wide build settings.

use std::path::{Path, PathBuf};

use crate::cache::{CacheError, CompileCache};
use crate::consts::CACHE_FILENAME;
use crate::toolchain::{Backend, BuildMode, CompileSettings};

/// Settings shared by every target of one run.
///
/// Immutable once built; workers share it through an `Arc`. The previous
/// run's cache lives here because it is only ever read.
#[derive(Debug, Clone)]
pub struct Project {
  pub backend: Backend,
  pub mode: BuildMode,
  pub root_dir: PathBuf,
  /// `<root>/build-<backend>-<mode>`
  pub out_dir: PathBuf,
  pub previous_cache: CompileCache,
}

impl Project {
  /// A project with an empty previous cache.
  pub fn new(root_dir: impl Into<PathBuf>, backend: Backend, mode: BuildMode) -> Self {
    let root_dir = root_dir.into();
    let out_dir = root_dir.join(format!("build-{backend}-{mode}"));
    Self {
      backend,
      mode,
      root_dir,
      out_dir,
      previous_cache: CompileCache::new(),
    }
  }

  /// A project whose previous cache is read from its output directory.
  pub fn load(root_dir: impl Into<PathBuf>, backend: Backend, mode: BuildMode) -> Result<Self, CacheError> {
    let mut project = Self::new(root_dir, backend, mode);
    project.previous_cache = CompileCache::load(&project.cache_path())?;
    Ok(project)
  }

  pub fn settings(&self) -> CompileSettings {
    CompileSettings {
      backend: self.backend,
      mode: self.mode,
    }
  }

  pub fn cache_path(&self) -> PathBuf {
    self.out_dir.join(CACHE_FILENAME)
  }

  pub fn source_dir(&self, name: &str) -> PathBuf {
    self.root_dir.join(name)
  }

  pub fn object_dir(&self, name: &str) -> PathBuf {
    self.out_dir.join(name)
  }

  /// Resolve a path given relative to the project root. Absolute paths pass through.
  pub fn resolve(&self, path: &Path) -> PathBuf {
    self.root_dir.join(path)
  }
}
