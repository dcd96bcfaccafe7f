//! Test utilities for kiln-lib.
//!
//! [`FakeToolchain`] puts scripted `gcc`, `clang` and `ar` stand-ins on
//! `PATH` so pipelines can run end to end without a real compiler. The
//! scripts copy their inputs to their output and log every invocation.
//! A source containing `FAIL_PREPROCESS` or `FAIL_COMPILE` makes the
//! matching stage exit non-zero.

#![cfg(unix)]

use std::ffi::OsString;
use std::fs;
use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const COMPILER_SCRIPT: &str = r#"#!/bin/sh
echo "@NAME@ $*" >> '@LOG@'
mode=link
out=
inputs=
while [ $# -gt 0 ]; do
  case "$1" in
    -E) mode=preprocess ;;
    -c) mode=compile ;;
    -o) shift; out="$1" ;;
    -*) ;;
    *) inputs="$inputs $1" ;;
  esac
  shift
done
case "$mode" in
  preprocess) if grep -q FAIL_PREPROCESS $inputs; then exit 1; fi ;;
  compile) if grep -q FAIL_COMPILE $inputs; then exit 1; fi ;;
esac
cat $inputs > "$out" || exit 1
if [ "$mode" = link ]; then chmod +x "$out"; fi
"#;

const ARCHIVER_SCRIPT: &str = r#"#!/bin/sh
echo "ar $*" >> '@LOG@'
shift
lib="$1"
shift
cat "$@" > "$lib"
"#;

pub struct FakeToolchain {
  dir: TempDir,
  path: OsString,
}

impl FakeToolchain {
  pub fn install() -> Self {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("calls.log");
    let log = log.to_str().unwrap();

    for name in ["gcc", "clang"] {
      let script = COMPILER_SCRIPT.replace("@NAME@", name).replace("@LOG@", log);
      write_script(&dir.path().join(name), &script);
    }
    write_script(&dir.path().join("ar"), &ARCHIVER_SCRIPT.replace("@LOG@", log));

    let mut path = OsString::from(dir.path());
    if let Some(existing) = std::env::var_os("PATH") {
      path.push(":");
      path.push(existing);
    }

    Self { dir, path }
  }

  /// Run an async block with the fake tools first on `PATH`.
  pub fn run<F, Fut, T>(&self, f: F) -> T
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
  {
    temp_env::with_var("PATH", Some(&self.path), || {
      tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f())
    })
  }

  pub fn calls(&self) -> Vec<String> {
    fs::read_to_string(self.log_path())
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  /// Logged invocations of `program`.
  pub fn calls_to(&self, program: &str) -> Vec<String> {
    let prefix = format!("{program} ");
    self.calls().into_iter().filter(|c| c.starts_with(&prefix)).collect()
  }

  pub fn clear_calls(&self) {
    let _ = fs::remove_file(self.log_path());
  }

  fn log_path(&self) -> PathBuf {
    self.dir.path().join("calls.log")
  }
}

fn write_script(path: &Path, content: &str) {
  fs::write(path, content).unwrap();
  fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}
