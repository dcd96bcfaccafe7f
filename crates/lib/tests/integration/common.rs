//! Shared helpers for integration tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kiln_lib::cache::CompileCache;
use kiln_lib::execute::{PipelineError, TargetOutcome, build_target, expand_sources};
use kiln_lib::project::Project;
use kiln_lib::target::{Lang, LibraryTarget};
use kiln_lib::toolchain::{Backend, BuildMode};
use tempfile::TempDir;

pub use crate::testutil::FakeToolchain;

/// A scratch project root plus fake compilers.
pub struct Workspace {
  pub temp: TempDir,
  pub fake: FakeToolchain,
}

impl Workspace {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
      fake: FakeToolchain::install(),
    }
  }

  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  /// Write a file relative to the root.
  pub fn write(&self, relative: &str, content: &str) {
    let path = self.root().join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn remove(&self, relative: &str) {
    std::fs::remove_file(self.root().join(relative)).unwrap();
  }

  pub fn project(&self, previous: CompileCache) -> Project {
    let mut project = Project::new(self.root(), Backend::Gcc, BuildMode::Debug);
    project.previous_cache = previous;
    project
  }

  pub fn library(&self, project: &Project, name: &str, flags: &str, sources: &[&str]) -> LibraryTarget {
    LibraryTarget::new(
      project,
      name,
      Lang::C,
      Path::new("include"),
      flags,
      sources.iter().map(|s| s.to_string()).collect(),
    )
  }

  /// Expand and build one target with the fake toolchain.
  pub fn build(&self, project: &Project, target: &mut LibraryTarget) -> Result<TargetOutcome, PipelineError> {
    let inputs = expand_sources(target)?;
    self
      .fake
      .run(move || async move { build_target(project, target, &inputs).await })
  }
}

/// Let file modification times move forward between runs.
pub fn tick() {
  std::thread::sleep(Duration::from_millis(20));
}
