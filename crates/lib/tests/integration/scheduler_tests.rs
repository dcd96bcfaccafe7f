//! Running several targets together.

use std::sync::Arc;

use kiln_lib::cache::CompileCache;
use kiln_lib::execute::{ExecMode, PipelineError, ScheduleError, run_jobs};
use kiln_lib::target::BuildStatus;
use serial_test::serial;

use super::common::{Workspace, tick};

fn two_library_workspace() -> Workspace {
  let ws = Workspace::new();
  ws.write("fribidi/lib/fribidi.c", "int fribidi;");
  ws.write("fribidi/lib/fribidi-bidi.c", "int bidi;");
  ws.write("freetype/src/base/ftinit.c", "int ftinit;");
  ws
}

fn run(ws: &Workspace, previous: CompileCache, mode: ExecMode) -> Result<kiln_lib::execute::ScheduleReport, ScheduleError> {
  let project = ws.project(previous);
  let targets = vec![
    ws.library(&project, "fribidi", "-DHAVE_CONFIG_H", &["lib/*.c"]),
    ws.library(&project, "freetype", "-DFT2_BUILD_LIBRARY", &["src/base/*.c"]),
  ];
  let project = Arc::new(project);
  ws.fake.run(move || run_jobs(project, targets, mode))
}

#[test]
#[serial]
fn two_targets_build_in_parallel_and_merge_caches() {
  let ws = two_library_workspace();

  let report = run(&ws, CompileCache::new(), ExecMode::Parallel).unwrap();
  report.ensure_all_succeeded().unwrap();

  let names: Vec<_> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
  assert_eq!(names, ["fribidi", "freetype"]);
  assert!(report.targets.iter().all(|t| t.status == BuildStatus::CompletedSuccess));
  assert!(report.targets.iter().all(|t| t.archive_path.exists()));
  assert_eq!(report.cache.len(), 3);
  assert!(report.outcomes.iter().all(|o| o.cache.is_empty()), "caches move into the merge");

  let second = run(&ws, report.cache, ExecMode::Parallel).unwrap();
  second.ensure_all_succeeded().unwrap();
  assert!(second.outcomes.iter().all(|o| o.compiled == 0 && !o.archived));
  assert_eq!(second.cache.len(), 3);
}

#[test]
#[serial]
fn editing_one_target_rebuilds_only_that_target() {
  let ws = two_library_workspace();
  let report = run(&ws, CompileCache::new(), ExecMode::Parallel).unwrap();
  report.ensure_all_succeeded().unwrap();

  tick();
  ws.write("freetype/src/base/ftinit.c", "int ftinit_v2;");
  ws.fake.clear_calls();

  let second = run(&ws, report.cache, ExecMode::Parallel).unwrap();
  second.ensure_all_succeeded().unwrap();

  let (fribidi, freetype) = (&second.outcomes[0], &second.outcomes[1]);
  assert_eq!((fribidi.compiled, fribidi.cached, fribidi.archived), (0, 2, false));
  assert_eq!((freetype.compiled, freetype.cached, freetype.archived), (1, 0, true));

  let archives = ws.fake.calls_to("ar");
  assert_eq!(archives.len(), 1);
  assert!(archives[0].contains("freetype"));
  let archive = std::fs::read_to_string(&second.targets[1].archive_path).unwrap();
  assert!(archive.contains("int ftinit_v2;"));
  assert_eq!(second.cache.len(), 3);
}

#[test]
#[serial]
fn serial_mode_builds_the_same() {
  let ws = two_library_workspace();

  let report = run(&ws, CompileCache::new(), ExecMode::Serial).unwrap();
  report.ensure_all_succeeded().unwrap();
  assert_eq!(report.cache.len(), 3);
  assert_eq!(ws.fake.calls_to("ar").len(), 2);
}

#[test]
#[serial]
fn one_failing_target_fails_the_run_but_not_its_sibling() {
  let ws = two_library_workspace();
  ws.write("freetype/src/base/ftbroken.c", "FAIL_COMPILE");

  let report = run(&ws, CompileCache::new(), ExecMode::Parallel).unwrap();

  assert!(report.targets[0].archive_path.exists(), "siblings are not cancelled");
  match report.ensure_all_succeeded() {
    Err(ScheduleError::TargetsFailed(names)) => assert_eq!(names, vec!["freetype"]),
    other => panic!("expected TargetsFailed, got {other:?}"),
  }
}

#[test]
#[serial]
fn empty_match_launches_nothing() {
  let ws = two_library_workspace();
  ws.remove("freetype/src/base/ftinit.c");

  let err = run(&ws, CompileCache::new(), ExecMode::Parallel).unwrap_err();

  assert!(matches!(
    err,
    ScheduleError::Pipeline {
      source: PipelineError::NoSources { .. },
      ..
    }
  ));
  assert!(ws.fake.calls().is_empty(), "no process may start");
}
