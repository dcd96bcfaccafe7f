//! Source fetching through git.
//!
//! A target's sources are cloned only when its source directory is missing or
//! empty. Clones of all targets run concurrently; pinned checkouts follow once
//! every clone has finished.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::process::{self, LaunchMode, ProcessError, ProcessHandle, ProcessStatus};
use crate::target::LibraryTarget;
use crate::util::fs::{FsError, is_missing_or_empty, path_str};

/// Where a library's sources come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSource {
  pub url: String,
  /// Checked out after a fresh clone.
  #[serde(default)]
  pub commit: Option<String>,
}

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("git clone of {url} for '{library}' failed")]
  CloneFailed { library: String, url: String },

  #[error("git checkout of {commit} for '{library}' failed")]
  CheckoutFailed { library: String, commit: String },

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error(transparent)]
  Fs(#[from] FsError),
}

/// Clone every missing source tree, then check out pinned commits in the fresh ones.
///
/// Returns the names of the libraries that were cloned.
pub async fn fetch_sources(sources: &[(&LibraryTarget, &GitSource)]) -> Result<Vec<String>, FetchError> {
  let mut handles = Vec::with_capacity(sources.len());
  let mut fresh = Vec::with_capacity(sources.len());

  for (target, source) in sources {
    let needs_clone = is_missing_or_empty(&target.source_dir);
    let handle = if needs_clone {
      let cmd = format!("git clone {} {}", source.url, path_str(&target.source_dir)?);
      info!(library = %target.name, url = %source.url, "git clone");
      process::launch(&cmd, LaunchMode::NoWait, None).await?
    } else {
      debug!(library = %target.name, "skip git clone");
      ProcessHandle::completed(format!("skip git clone {}", target.name), true)
    };
    handles.push(handle);
    fresh.push(needs_clone);
  }

  process::wait_all(&mut handles).await?;
  for ((target, source), handle) in sources.iter().zip(&handles) {
    if handle.status() != ProcessStatus::CompletedSuccess {
      return Err(FetchError::CloneFailed {
        library: target.name.clone(),
        url: source.url.clone(),
      });
    }
  }

  let mut cloned = Vec::new();
  for ((target, source), fresh) in sources.iter().zip(fresh) {
    if !fresh {
      continue;
    }
    if let Some(commit) = &source.commit {
      let cmd = format!("git -C {} checkout {commit} --", path_str(&target.source_dir)?);
      let handle = process::launch(&cmd, LaunchMode::Wait, None).await?;
      if handle.status() != ProcessStatus::CompletedSuccess {
        return Err(FetchError::CheckoutFailed {
          library: target.name.clone(),
          commit: commit.clone(),
        });
      }
    }
    cloned.push(target.name.clone());
  }

  Ok(cloned)
}
