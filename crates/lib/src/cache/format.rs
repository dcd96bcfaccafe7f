//! On-disk format of the compile cache.
//!
//! A header row followed by one row per entry, every field double-quoted:
//!
//! ```text
//! "objPath","compileCmd","preprocessedHash"
//! "/p/build-gcc-debug/zlib/adler32.obj","gcc -g -DX -c /p/zlib/adler32.c -o ...","0x1F00A3"
//! ```
//!
//! Fields are JSON string literals, so quotes and backslashes inside a command
//! survive a round trip. A field with neither is written byte-for-byte as a
//! plain quoted CSV field.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use super::CacheEntry;
use crate::util::hash::PreprocessedHash;

pub const HEADER: [&str; 3] = ["objPath", "compileCmd", "preprocessedHash"];

#[derive(Debug, Error)]
pub enum FormatError {
  #[error("cache file is empty")]
  Empty,

  #[error("unexpected cache header: {0}")]
  Header(String),

  #[error("malformed cache row {line}: {reason}")]
  Row { line: usize, reason: String },

  #[error("failed to encode cache field: {0}")]
  Encode(#[from] serde_json::Error),
}

/// Render entries in key order.
pub fn render(entries: &BTreeMap<PathBuf, CacheEntry>) -> Result<String, FormatError> {
  let mut out = String::new();
  write_row(&mut out, HEADER)?;
  for (path, entry) in entries {
    let path = path.to_string_lossy();
    let hash = entry.hash.to_string();
    write_row(&mut out, [path.as_ref(), entry.command.as_str(), hash.as_str()])?;
  }
  Ok(out)
}

fn write_row(out: &mut String, fields: [&str; 3]) -> Result<(), FormatError> {
  for (i, field) in fields.iter().enumerate() {
    if i > 0 {
      out.push(',');
    }
    out.push_str(&serde_json::to_string(field)?);
  }
  out.push('\n');
  Ok(())
}

/// Parse a whole cache file.
///
/// Any deviation from the format rejects the file as a whole; a partially
/// applied cache could hide a stale object.
pub fn parse(content: &str) -> Result<BTreeMap<PathBuf, CacheEntry>, FormatError> {
  let mut lines = content.lines().map(|l| l.trim_end_matches('\r')).enumerate();

  let (_, header) = lines.next().ok_or(FormatError::Empty)?;
  let header_fields = parse_row(header).map_err(|_| FormatError::Header(header.to_string()))?;
  if header_fields != HEADER {
    return Err(FormatError::Header(header.to_string()));
  }

  let mut entries = BTreeMap::new();
  for (index, line) in lines {
    if line.trim().is_empty() {
      continue;
    }
    let line_no = index + 1;
    let [path, command, hash] = parse_row(line).map_err(|reason| FormatError::Row { line: line_no, reason })?;
    let hash = PreprocessedHash::parse(&hash).ok_or_else(|| FormatError::Row {
      line: line_no,
      reason: format!("invalid hash '{hash}'"),
    })?;
    entries.insert(PathBuf::from(path), CacheEntry { command, hash });
  }
  Ok(entries)
}

fn parse_row(line: &str) -> Result<[String; 3], String> {
  serde_json::from_str::<[String; 3]>(&format!("[{line}]")).map_err(|e| e.to_string())
}
