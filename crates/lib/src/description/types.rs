use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::link::Executable;
use crate::prepare::{Generator, Patch};
use crate::target::Lang;

/// A parsed build description file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Description {
  #[serde(default, rename = "library")]
  pub libraries: Vec<LibraryDesc>,
  #[serde(default)]
  pub executable: Option<ExecutableDesc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryDesc {
  pub name: String,
  #[serde(default)]
  pub lang: Lang,
  /// Clone source; the source directory is used as is when absent.
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub commit: Option<String>,
  /// Relative to the library's source directory.
  #[serde(default = "default_include_dir")]
  pub include_dir: PathBuf,
  #[serde(default)]
  pub flags: Vec<String>,
  #[serde(default)]
  pub sources: Vec<String>,
  /// Libraries whose headers this one includes.
  #[serde(default)]
  pub include_from: Vec<String>,
  /// Extra sources and flags per host OS (`linux`, `windows`, `macos`).
  #[serde(default)]
  pub os: BTreeMap<String, OsExtras>,
  #[serde(default, rename = "patch")]
  pub patches: Vec<Patch>,
  #[serde(default, rename = "generator")]
  pub generators: Vec<Generator>,
}

fn default_include_dir() -> PathBuf {
  PathBuf::from("include")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OsExtras {
  #[serde(default)]
  pub sources: Vec<String>,
  #[serde(default)]
  pub flags: Vec<String>,
  /// Only meaningful for the executable.
  #[serde(default)]
  pub link_flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutableDesc {
  pub source: PathBuf,
  #[serde(default)]
  pub lang: Lang,
  #[serde(default)]
  pub flags: Vec<String>,
  #[serde(default)]
  pub link_flags: Vec<String>,
  /// Link order. Defaults to every library in declaration order.
  #[serde(default)]
  pub libraries: Option<Vec<String>>,
  #[serde(default)]
  pub os: BTreeMap<String, OsExtras>,
}

impl ExecutableDesc {
  pub(super) fn resolve(&self, os: &str, all_libraries: &[LibraryDesc]) -> Executable {
    let extras = self.os.get(os);
    let flags = self
      .flags
      .iter()
      .chain(extras.into_iter().flat_map(|e| e.flags.iter()))
      .map(String::as_str)
      .collect::<Vec<_>>()
      .join(" ");
    let link_flags = self
      .link_flags
      .iter()
      .chain(extras.into_iter().flat_map(|e| e.link_flags.iter()))
      .map(String::as_str)
      .collect::<Vec<_>>()
      .join(" ");
    let libraries = self
      .libraries
      .clone()
      .unwrap_or_else(|| all_libraries.iter().map(|l| l.name.clone()).collect());

    Executable {
      source: self.source.clone(),
      lang: self.lang,
      flags,
      link_flags,
      libraries,
    }
  }
}
