//! Whole runs from a build description.

use std::fs;

use kiln_lib::consts::CACHE_FILENAME;
use kiln_lib::execute::ExecMode;
use kiln_lib::toolchain::{Backend, BuildMode};
use kiln_lib::{BuildError, BuildOptions, run_build};
use serial_test::serial;

use super::common::Workspace;

const DESCRIPTION: &str = r#"
[[library]]
name = "fribidi"
include_dir = "lib"
flags = ["-DHAVE_CONFIG_H"]
sources = ["lib/*.c"]

[[library.generator]]
sources = ["gen/gen-tab.c"]
args = ["{src}"]
output = "lib/tab.i"

[[library]]
name = "harfbuzz"
lang = "cpp"
include_dir = "src"
sources = ["src/*.cc"]
include_from = ["fribidi"]

[executable]
source = "example.c"
flags = ["-Wall"]
link_flags = ["-lm"]
"#;

fn workspace() -> Workspace {
  let ws = Workspace::new();
  ws.write("kiln.toml", DESCRIPTION);
  ws.write("fribidi/lib/fribidi.c", "int fribidi;");
  ws.write("fribidi/gen/gen-tab.c", "echo generated\n");
  ws.write("harfbuzz/src/hb.cc", "int hb;");
  ws.write("example.c", "int main;");
  ws
}

fn options(ws: &Workspace) -> BuildOptions {
  BuildOptions {
    backend: Backend::Gcc,
    mode: BuildMode::Debug,
    description: ws.root().join("kiln.toml"),
    root_dir: None,
    exec_mode: Some(ExecMode::Parallel),
    clean: false,
    fetch: true,
  }
}

#[test]
#[serial]
fn full_build_then_no_op_rebuild() {
  let ws = workspace();
  let options = options(&ws);

  let report = ws.fake.run(|| async { run_build(&options).await.unwrap() });

  let out = ws.root().join("build-gcc-debug");
  assert_eq!(report.out_dir, out);
  assert_eq!(report.compiled(), 2);
  assert_eq!(report.executable.as_deref(), Some(out.join("example.bin").as_path()));
  assert!(out.join("example.bin").exists());
  assert_eq!(report.cache_entries, 3);
  assert_eq!(
    fs::read_to_string(ws.root().join("fribidi/lib/tab.i")).unwrap(),
    "generated\n"
  );
  assert!(out.join("harfbuzz/hb.ii").exists());

  let cache = fs::read_to_string(out.join(CACHE_FILENAME)).unwrap();
  assert!(cache.starts_with("\"objPath\",\"compileCmd\",\"preprocessedHash\"\n"));
  assert_eq!(cache.lines().count(), 4);

  ws.fake.clear_calls();
  let again = ws.fake.run(|| async { run_build(&options).await.unwrap() });
  assert_eq!(again.compiled(), 0);
  assert_eq!(again.cached(), 2);
  assert!(ws.fake.calls().iter().all(|c| !c.contains(" -c ")), "{:?}", ws.fake.calls());
  assert!(ws.fake.calls_to("ar").is_empty());
}

#[test]
#[serial]
fn clean_rebuilds_every_object() {
  let ws = workspace();
  let mut options = options(&ws);
  ws.fake.run(|| async { run_build(&options).await.unwrap() });

  options.clean = true;
  options.exec_mode = Some(ExecMode::Serial);
  let report = ws.fake.run(|| async { run_build(&options).await.unwrap() });
  assert_eq!(report.compiled(), 2);
}

#[test]
#[serial]
fn failed_run_keeps_previous_cache() {
  let ws = workspace();
  let options = options(&ws);
  ws.fake.run(|| async { run_build(&options).await.unwrap() });
  let cache_path = ws.root().join("build-gcc-debug").join(CACHE_FILENAME);
  let saved = fs::read_to_string(&cache_path).unwrap();

  ws.write("harfbuzz/src/broken.cc", "FAIL_COMPILE");
  let err = ws.fake.run(|| async { run_build(&options).await.unwrap_err() });

  assert!(matches!(err, BuildError::Schedule(_)));
  assert_eq!(fs::read_to_string(&cache_path).unwrap(), saved);
}

#[test]
#[serial]
fn invalid_description_fails_before_building() {
  let ws = workspace();
  ws.write("kiln.toml", "[[library]]\nname = \"a\"\n");

  let options = options(&ws);
  let err = ws.fake.run(|| async { run_build(&options).await.unwrap_err() });

  assert!(matches!(err, BuildError::Description(_)));
  assert!(!ws.root().join("build-gcc-debug").exists());
}
