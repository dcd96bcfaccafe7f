//! Command synthesis for the supported compiler backends.
//!
//! Every command the engine runs (preprocess, compile, link, archive) is
//! produced here. The output string doubles as cache key material, so
//! synthesis is a pure function of its inputs: identical logical inputs give
//! byte-identical commands across runs.
//!
//! Each [`Backend`] maps to one [`Toolchain`] implementation that knows its
//! own flag spelling; [`synthesize`] only decides *which* pieces are needed.

mod gnu;
mod msvc;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{OBJ_EXT, PREPROCESSED_C_EXT, PREPROCESSED_CPP_EXT};

pub use gnu::Gnu;
pub use msvc::Msvc;

/// Supported compiler backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  Gcc,
  Clang,
  Msvc,
}

impl Backend {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Gcc => "gcc",
      Self::Clang => "clang",
      Self::Msvc => "msvc",
    }
  }

  /// Backends usable on the host platform.
  pub fn host_backends() -> &'static [Backend] {
    if cfg!(windows) {
      &[Backend::Msvc, Backend::Clang]
    } else {
      &[Backend::Gcc, Backend::Clang]
    }
  }

  /// Fails if this backend is not available on the host platform.
  pub fn ensure_host_supported(self) -> Result<(), SelectionError> {
    if Self::host_backends().contains(&self) {
      Ok(())
    } else {
      Err(SelectionError::UnsupportedBackend {
        backend: self.as_str().to_string(),
        os: std::env::consts::OS.to_string(),
      })
    }
  }

  /// The flag dialect for this backend.
  pub fn toolchain(self) -> &'static dyn Toolchain {
    match self {
      Self::Gcc => &gnu::GCC,
      Self::Clang => &gnu::CLANG,
      Self::Msvc => &Msvc,
    }
  }
}

impl fmt::Display for Backend {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Backend {
  type Err = SelectionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "gcc" => Ok(Self::Gcc),
      "clang" => Ok(Self::Clang),
      "msvc" => Ok(Self::Msvc),
      other => Err(SelectionError::UnknownBackend(other.to_string())),
    }
  }
}

/// Optimization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
  Debug,
  Release,
}

impl BuildMode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Debug => "debug",
      Self::Release => "release",
    }
  }
}

impl fmt::Display for BuildMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BuildMode {
  type Err = SelectionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "debug" => Ok(Self::Debug),
      "release" => Ok(Self::Release),
      other => Err(SelectionError::UnknownMode(other.to_string())),
    }
  }
}

#[derive(Debug, Error)]
pub enum SelectionError {
  #[error("unknown compiler backend '{0}' (expected gcc, clang or msvc)")]
  UnknownBackend(String),

  #[error("compiler backend '{backend}' is not supported on {os}")]
  UnsupportedBackend { backend: String, os: String },

  #[error("unknown build mode '{0}' (expected debug or release)")]
  UnknownMode(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
  #[error("cannot preprocess already preprocessed input '{input}' into '{output}'")]
  PreprocessedToPreprocessed { input: String, output: String },
}

/// The two axes a command depends on besides its files and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompileSettings {
  pub backend: Backend,
  pub mode: BuildMode,
}

/// Flag spelling of one backend.
pub trait Toolchain: Sync {
  /// Program name plus any flags every invocation carries.
  fn program(&self) -> &'static str;

  fn optimization_flag(&self, mode: BuildMode) -> &'static str;

  /// Flags that switch to preprocess-only mode writing to `output`.
  fn preprocess_flags(&self, output: &str) -> String;

  /// Flag telling the compiler its input is already preprocessed, if it needs one.
  fn preprocessed_input_flag(&self) -> Option<&'static str>;

  /// Compile without linking.
  fn compile_only_flag(&self) -> &'static str;

  /// Input and output plumbing.
  fn io_args(&self, input: &str, output: &str, kind: OutputKind) -> String;

  /// Flags that introduce the link-flag section, if the backend needs any.
  fn link_mode_flags(&self) -> Option<&'static str>;

  /// Static library creation over `objects`.
  fn archive_command(&self, library: &str, objects: &[String]) -> String;
}

/// What a synthesized command produces, derived from the output extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
  Preprocessed,
  Object,
  Linked,
}

fn is_preprocessed(path: &str) -> bool {
  ends_with_ext(path, PREPROCESSED_C_EXT) || ends_with_ext(path, PREPROCESSED_CPP_EXT)
}

fn ends_with_ext(path: &str, ext: &str) -> bool {
  path
    .strip_suffix(ext)
    .is_some_and(|rest| rest.ends_with('.'))
}

/// Build the command line that turns `input` into `output`.
///
/// * An `.i`/`.ii` output selects preprocess-only mode.
/// * An `.i`/`.ii` input gets the backend's "already preprocessed" flag.
///   Both at once is a programming error and is rejected.
/// * `flags` is appended verbatim.
/// * An `.obj` output adds the compile-only flag.
/// * Non-empty `link_flags` make this a link: link-mode flags, then the link flags.
///
/// `input` may hold several space-separated paths (objects and archives for a link).
pub fn synthesize(
  settings: CompileSettings,
  flags: &str,
  input: &str,
  output: &str,
  link_flags: &str,
) -> Result<String, CommandError> {
  let toolchain = settings.backend.toolchain();

  let input_preprocessed = is_preprocessed(input);
  let output_preprocessed = is_preprocessed(output);
  if input_preprocessed && output_preprocessed {
    return Err(CommandError::PreprocessedToPreprocessed {
      input: input.to_string(),
      output: output.to_string(),
    });
  }

  let kind = if output_preprocessed {
    OutputKind::Preprocessed
  } else if ends_with_ext(output, OBJ_EXT) {
    OutputKind::Object
  } else {
    OutputKind::Linked
  };

  let mut cmd = String::from(toolchain.program());
  push_arg(&mut cmd, toolchain.optimization_flag(settings.mode));

  if output_preprocessed {
    push_arg(&mut cmd, &toolchain.preprocess_flags(output));
  }
  if input_preprocessed && let Some(flag) = toolchain.preprocessed_input_flag() {
    push_arg(&mut cmd, flag);
  }

  push_arg(&mut cmd, flags);

  if kind == OutputKind::Object {
    push_arg(&mut cmd, toolchain.compile_only_flag());
  }

  push_arg(&mut cmd, &toolchain.io_args(input, output, kind));

  if !link_flags.trim().is_empty() {
    if let Some(mode_flags) = toolchain.link_mode_flags() {
      push_arg(&mut cmd, mode_flags);
    }
    push_arg(&mut cmd, link_flags);
  }

  Ok(cmd)
}

/// Build the archiver command for a static library.
pub fn archive_command(backend: Backend, library: &str, objects: &[String]) -> String {
  backend.toolchain().archive_command(library, objects)
}

fn push_arg(cmd: &mut String, arg: &str) {
  let arg = arg.trim();
  if !arg.is_empty() {
    cmd.push(' ');
    cmd.push_str(arg);
  }
}
