//! Per-target pipeline behavior across runs.

use kiln_lib::cache::CompileCache;
use kiln_lib::target::BuildStatus;
use serial_test::serial;

use super::common::{Workspace, tick};

fn zlib_workspace() -> Workspace {
  let ws = Workspace::new();
  ws.write("zlib/adler32.c", "int adler;");
  ws.write("zlib/crc32.c", "int crc;");
  ws.write("zlib/include/zlib.h", "#define ZLIB 1");
  ws
}

#[test]
#[serial]
fn first_run_compiles_and_archives_everything() {
  let ws = zlib_workspace();
  let project = ws.project(CompileCache::new());
  let mut target = ws.library(&project, "zlib", "-DZ", &["*.c"]);

  let outcome = ws.build(&project, &mut target).unwrap();

  assert_eq!(outcome.status, BuildStatus::CompletedSuccess);
  assert_eq!(target.status, BuildStatus::CompletedSuccess);
  assert_eq!((outcome.compiled, outcome.cached), (2, 0));
  assert!(outcome.archived);
  assert_eq!(outcome.cache.len(), 2);
  assert!(target.object_dir.join("adler32.obj").exists());
  assert!(target.object_dir.join("crc32.i").exists());
  assert!(target.archive_path.exists());

  let preprocess = ws.fake.calls_to("gcc").into_iter().filter(|c| c.contains(" -E ")).count();
  assert_eq!(preprocess, 2);
  assert_eq!(ws.fake.calls_to("ar").len(), 1);
}

#[test]
#[serial]
fn unchanged_second_run_compiles_nothing() {
  let ws = zlib_workspace();
  let project = ws.project(CompileCache::new());
  let mut target = ws.library(&project, "zlib", "-DZ", &["*.c"]);
  let first = ws.build(&project, &mut target).unwrap();

  tick();
  ws.fake.clear_calls();
  let project = ws.project(first.cache);
  let mut target = ws.library(&project, "zlib", "-DZ", &["*.c"]);
  let second = ws.build(&project, &mut target).unwrap();

  assert!(second.succeeded());
  assert_eq!((second.compiled, second.cached), (0, 2));
  assert!(!second.archived);
  assert_eq!(second.cache.len(), 2);

  let calls = ws.fake.calls();
  assert_eq!(calls.len(), 2, "only preprocessing: {calls:?}");
  assert!(calls.iter().all(|c| c.contains(" -E ")));
}

#[test]
#[serial]
fn content_change_recompiles_only_that_object() {
  let ws = zlib_workspace();
  let project = ws.project(CompileCache::new());
  let mut target = ws.library(&project, "zlib", "", &["*.c"]);
  let first = ws.build(&project, &mut target).unwrap();

  tick();
  ws.write("zlib/crc32.c", "int crc = 2;");
  ws.fake.clear_calls();
  let project = ws.project(first.cache);
  let mut target = ws.library(&project, "zlib", "", &["*.c"]);
  let second = ws.build(&project, &mut target).unwrap();

  assert_eq!((second.compiled, second.cached), (1, 1));
  assert!(second.archived, "a new object makes the archive stale");
  let compiles: Vec<_> = ws.fake.calls_to("gcc").into_iter().filter(|c| c.contains(" -c ")).collect();
  assert_eq!(compiles.len(), 1);
  assert!(compiles[0].contains("crc32.c"));
}

#[test]
#[serial]
fn flag_change_recompiles_everything() {
  let ws = zlib_workspace();
  let project = ws.project(CompileCache::new());
  let mut target = ws.library(&project, "zlib", "-DA", &["*.c"]);
  let first = ws.build(&project, &mut target).unwrap();

  tick();
  let project = ws.project(first.cache);
  let mut target = ws.library(&project, "zlib", "-DB", &["*.c"]);
  let second = ws.build(&project, &mut target).unwrap();

  assert_eq!((second.compiled, second.cached), (2, 0));
  let entry = second.cache.lookup(&target.object_dir.join("adler32.obj")).unwrap();
  assert!(entry.command.contains("-DB"));
}

#[test]
#[serial]
fn deleted_object_is_rebuilt() {
  let ws = zlib_workspace();
  let project = ws.project(CompileCache::new());
  let mut target = ws.library(&project, "zlib", "", &["*.c"]);
  let first = ws.build(&project, &mut target).unwrap();
  std::fs::remove_file(target.object_dir.join("adler32.obj")).unwrap();

  let project = ws.project(first.cache);
  let mut target = ws.library(&project, "zlib", "", &["*.c"]);
  let second = ws.build(&project, &mut target).unwrap();

  assert_eq!((second.compiled, second.cached), (1, 1));
  assert!(target.object_dir.join("adler32.obj").exists());
}

#[test]
#[serial]
fn removed_source_evicts_its_object() {
  let ws = zlib_workspace();
  let project = ws.project(CompileCache::new());
  let mut target = ws.library(&project, "zlib", "", &["*.c"]);
  let first = ws.build(&project, &mut target).unwrap();

  ws.remove("zlib/crc32.c");
  let project = ws.project(first.cache);
  let mut target = ws.library(&project, "zlib", "", &["*.c"]);
  let second = ws.build(&project, &mut target).unwrap();

  assert_eq!(second.evicted, 1);
  assert!(!target.object_dir.join("crc32.obj").exists());
  assert!(!target.object_dir.join("crc32.i").exists());
  assert!(target.object_dir.join("adler32.obj").exists());
  assert_eq!(second.cache.len(), 1);

  assert_eq!(second.compiled, 0);
  assert!(second.archived);
  let archive = std::fs::read_to_string(&target.archive_path).unwrap();
  assert!(archive.contains("int adler;"));
  assert!(!archive.contains("int crc;"));
}

#[test]
#[serial]
fn compile_failure_marks_target_failed_without_archiving() {
  let ws = zlib_workspace();
  ws.write("zlib/broken.c", "FAIL_COMPILE");
  let project = ws.project(CompileCache::new());
  let mut target = ws.library(&project, "zlib", "", &["*.c"]);

  let outcome = ws.build(&project, &mut target).unwrap();

  assert_eq!(outcome.status, BuildStatus::CompletedFailed);
  assert_eq!(target.status, BuildStatus::CompletedFailed);
  assert!(ws.fake.calls_to("ar").is_empty());
  assert!(!target.archive_path.exists());
}

#[test]
#[serial]
fn preprocess_failure_stops_before_compiling() {
  let ws = zlib_workspace();
  ws.write("zlib/broken.c", "FAIL_PREPROCESS");
  let project = ws.project(CompileCache::new());
  let mut target = ws.library(&project, "zlib", "", &["*.c"]);

  let outcome = ws.build(&project, &mut target).unwrap();

  assert!(!outcome.succeeded());
  assert!(ws.fake.calls_to("gcc").iter().all(|c| !c.contains(" -c ")));
}
