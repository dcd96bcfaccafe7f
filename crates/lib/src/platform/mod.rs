//! Host platform facts the engine depends on.

mod debugger;

pub use debugger::debugger_attached;

/// Extension of executables produced by the engine (generators, the final program).
pub fn exe_extension() -> &'static str {
  if cfg!(windows) { "exe" } else { "bin" }
}

/// Extension of static libraries.
pub fn archive_extension() -> &'static str {
  if cfg!(windows) { "lib" } else { "a" }
}
