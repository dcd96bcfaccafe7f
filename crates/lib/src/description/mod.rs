//! Build descriptions.
//!
//! A TOML file lists the libraries to build and, optionally, the program to
//! link against them:
//!
//! ```toml
//! [[library]]
//! name = "fribidi"
//! url = "https://github.com/fribidi/fribidi"
//! commit = "v1.0.12"
//! include_dir = "lib"
//! flags = ["-DHAVE_CONFIG_H"]
//! sources = ["lib/*.c"]
//!
//! [[library.generator]]
//! sources = ["gen.tab/packtab.c", "gen.tab/gen-mirroring-tab.c"]
//! args = ["2", "{src}/gen.tab/unidata/BidiMirroring.txt"]
//! output = "lib/mirroring.tab.i"
//!
//! [executable]
//! source = "example.c"
//! flags = ["-Wall"]
//!
//! [executable.os.linux]
//! link_flags = ["-lm"]
//! ```

mod types;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::link::Executable;
use crate::prepare::{GitSource, Generator, Patch};
use crate::project::Project;
use crate::target::LibraryTarget;

pub use types::{Description, ExecutableDesc, LibraryDesc, OsExtras};

const KNOWN_OSES: [&str; 3] = ["linux", "windows", "macos"];

#[derive(Debug, Error)]
pub enum DescriptionError {
  #[error("failed to read build description {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse build description {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid library name '{0}'")]
  InvalidName(String),

  #[error("library '{0}' is declared more than once")]
  DuplicateLibrary(String),

  #[error("library '{library}' includes unknown library '{dependency}'")]
  UnknownDependency { library: String, dependency: String },

  #[error("library '{0}' has no sources")]
  NoSources(String),

  #[error("library '{0}' pins a commit but has no url")]
  CommitWithoutUrl(String),

  #[error("library '{library}' has a generator without sources")]
  EmptyGenerator { library: String },

  #[error("'{os}' in '{owner}' is not a known OS (expected linux, windows or macos)")]
  UnknownOs { owner: String, os: String },

  #[error("executable links unknown library '{0}'")]
  UnknownLinkLibrary(String),
}

/// Everything needed to build one library.
#[derive(Debug, Clone)]
pub struct LibraryPlan {
  pub target: LibraryTarget,
  pub source: Option<GitSource>,
  pub patches: Vec<Patch>,
  pub generators: Vec<Generator>,
}

impl Description {
  /// Read and validate a description file.
  pub fn load(path: &Path) -> Result<Self, DescriptionError> {
    let content = fs::read_to_string(path).map_err(|source| DescriptionError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let description = Self::parse(&content).map_err(|e| match e {
      ParseOrInvalid::Parse(source) => DescriptionError::Parse {
        path: path.to_path_buf(),
        source,
      },
      ParseOrInvalid::Invalid(e) => e,
    })?;
    debug!(path = %path.display(), libraries = description.libraries.len(), "loaded build description");
    Ok(description)
  }

  fn parse(content: &str) -> Result<Self, ParseOrInvalid> {
    let description: Self = toml::from_str(content).map_err(ParseOrInvalid::Parse)?;
    description.validate().map_err(ParseOrInvalid::Invalid)?;
    Ok(description)
  }

  /// Check names and cross references.
  pub fn validate(&self) -> Result<(), DescriptionError> {
    let mut names = HashSet::new();
    for library in &self.libraries {
      let name = &library.name;
      if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(DescriptionError::InvalidName(name.clone()));
      }
      if !names.insert(name.as_str()) {
        return Err(DescriptionError::DuplicateLibrary(name.clone()));
      }
    }

    for library in &self.libraries {
      let name = &library.name;
      if let Some(dependency) = library.include_from.iter().find(|d| !names.contains(d.as_str())) {
        return Err(DescriptionError::UnknownDependency {
          library: name.clone(),
          dependency: dependency.clone(),
        });
      }
      check_oses(name, library.os.keys())?;
      let has_sources = !library.sources.is_empty() || library.os.values().any(|e| !e.sources.is_empty());
      if !has_sources {
        return Err(DescriptionError::NoSources(name.clone()));
      }
      if library.commit.is_some() && library.url.is_none() {
        return Err(DescriptionError::CommitWithoutUrl(name.clone()));
      }
      if library.generators.iter().any(|g| g.sources.is_empty()) {
        return Err(DescriptionError::EmptyGenerator { library: name.clone() });
      }
    }

    if let Some(executable) = &self.executable {
      check_oses("executable", executable.os.keys())?;
      if let Some(unknown) = executable
        .libraries
        .iter()
        .flatten()
        .find(|l| !names.contains(l.as_str()))
      {
        return Err(DescriptionError::UnknownLinkLibrary(unknown.clone()));
      }
    }

    Ok(())
  }

  /// Instantiate targets for the host OS.
  pub fn plan(&self, project: &Project) -> Vec<LibraryPlan> {
    self.plan_for_os(project, std::env::consts::OS)
  }

  fn plan_for_os(&self, project: &Project, os: &str) -> Vec<LibraryPlan> {
    let mut plans: Vec<LibraryPlan> = self
      .libraries
      .iter()
      .map(|library| {
        let extras = library.os.get(os);
        let flags = library
          .flags
          .iter()
          .chain(extras.into_iter().flat_map(|e| e.flags.iter()))
          .map(String::as_str)
          .collect::<Vec<_>>()
          .join(" ");
        let sources = library
          .sources
          .iter()
          .chain(extras.into_iter().flat_map(|e| e.sources.iter()))
          .cloned()
          .collect();

        LibraryPlan {
          target: LibraryTarget::new(project, &library.name, library.lang, &library.include_dir, &flags, sources),
          source: library.url.as_ref().map(|url| GitSource {
            url: url.clone(),
            commit: library.commit.clone(),
          }),
          patches: library.patches.clone(),
          generators: library.generators.clone(),
        }
      })
      .collect();

    // Include flags of dependencies, resolved against the unmodified targets.
    let originals: Vec<LibraryTarget> = plans.iter().map(|p| p.target.clone()).collect();
    for (plan, library) in plans.iter_mut().zip(&self.libraries) {
      for dependency in &library.include_from {
        if let Some(other) = originals.iter().find(|t| &t.name == dependency) {
          plan.target.add_include_of(other);
        }
      }
    }

    plans
  }

  /// The program to link, resolved for the host OS.
  pub fn executable(&self) -> Option<Executable> {
    self
      .executable
      .as_ref()
      .map(|e| e.resolve(std::env::consts::OS, &self.libraries))
  }
}

enum ParseOrInvalid {
  Parse(toml::de::Error),
  Invalid(DescriptionError),
}

fn check_oses<'a>(owner: &str, oses: impl IntoIterator<Item = &'a String>) -> Result<(), DescriptionError> {
  for os in oses {
    if !KNOWN_OSES.contains(&os.as_str()) {
      return Err(DescriptionError::UnknownOs {
        owner: owner.to_string(),
        os: os.clone(),
      });
    }
  }
  Ok(())
}
