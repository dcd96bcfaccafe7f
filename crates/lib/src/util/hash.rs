//! Content hashing for change detection.
//!
//! Object files are keyed by a 64-bit hash of their *preprocessed* source. The
//! value is the leading 8 bytes of the SHA-256 digest, read big-endian, so the
//! same bytes always produce the same number on every platform.

use std::fs;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::consts::PREPROCESSED_HASH_BYTES;

/// A 64-bit content hash of a preprocessed translation unit.
///
/// # Format
///
/// Rendered as a `0x`-prefixed uppercase hexadecimal literal, e.g. `0x1F00A3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreprocessedHash(pub u64);

impl std::fmt::Display for PreprocessedHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "0x{:X}", self.0)
  }
}

impl PreprocessedHash {
  /// Parse a rendered hash.
  ///
  /// Accepts the `0x`/`0X` hexadecimal form written by the cache as well as a
  /// plain decimal integer. Returns `None` for anything else.
  pub fn parse(s: &str) -> Option<Self> {
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
      Some(hex) if !hex.is_empty() => u64::from_str_radix(hex, 16).ok()?,
      Some(_) => return None,
      None => s.parse::<u64>().ok()?,
    };
    Some(Self(value))
  }
}

/// Error while hashing a file.
#[derive(Debug, Error)]
#[error("failed to read {path} for hashing: {source}")]
pub struct HashError {
  pub path: String,
  #[source]
  pub source: std::io::Error,
}

/// Hash a file's contents.
pub fn hash_file(path: &Path) -> Result<PreprocessedHash, HashError> {
  let to_err = |source| HashError {
    path: path.display().to_string(),
    source,
  };

  let mut file = fs::File::open(path).map_err(to_err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(to_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(truncate(&hasher.finalize()))
}

fn truncate(digest: &[u8]) -> PreprocessedHash {
  let mut prefix = [0u8; PREPROCESSED_HASH_BYTES];
  prefix.copy_from_slice(&digest[..PREPROCESSED_HASH_BYTES]);
  PreprocessedHash(u64::from_be_bytes(prefix))
}
