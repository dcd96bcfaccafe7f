//! Getting library sources ready before any target is built.
//!
//! * [`fetch`] clones missing source trees and pins them to a commit.
//! * [`apply_patches`] edits freshly fetched trees in place.
//! * [`generate`] builds and runs helper programs that emit sources.

pub mod fetch;
pub mod generate;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::target::LibraryTarget;
use crate::util::fs::{FsError, replace_in_file};

pub use fetch::{FetchError, GitSource, fetch_sources};
pub use generate::{GenerateError, Generator, run_generator};

/// An exact-text replacement in one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
  /// Relative to the library's source directory.
  pub file: PathBuf,
  pub find: String,
  pub replace: String,
}

/// Apply `patches` to a freshly fetched target.
///
/// Trees that were already present are left alone, since they have been
/// patched before. Returns the total number of replacements made.
pub fn apply_patches(target: &LibraryTarget, patches: &[Patch]) -> Result<usize, FsError> {
  if !target.freshly_fetched || patches.is_empty() {
    return Ok(0);
  }

  let mut total = 0;
  for patch in patches {
    let path = target.source_dir.join(&patch.file);
    let count = replace_in_file(&path, &patch.find, &patch.replace)?;
    if count == 0 {
      warn!(library = %target.name, file = %path.display(), "patch text not found");
    }
    total += count;
  }
  info!(library = %target.name, replacements = total, "applied patches");
  Ok(total)
}
