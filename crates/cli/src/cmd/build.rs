//! Implementation of the `kiln <backend> <mode>` build.
//!
//! Loads the build description, picks serial or parallel execution, runs the
//! build on a runtime sized for it, and prints a summary.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::debug;

use kiln_lib::description::Description;
use kiln_lib::execute::ExecMode;
use kiln_lib::toolchain::{Backend, BuildMode};
use kiln_lib::{BuildOptions, BuildReport, run_build};

use crate::output::{format_duration, print_info, print_stat, print_success};

pub struct BuildArgs {
  pub backend: Backend,
  pub mode: BuildMode,
  pub file: PathBuf,
  pub root: Option<PathBuf>,
  pub serial: bool,
  pub clean: bool,
  pub fetch: bool,
}

/// Execute a build.
///
/// Serial mode (forced, or with a debugger attached) runs on a single-threaded
/// runtime; parallel mode gets one worker thread per library.
pub fn cmd_build(args: BuildArgs) -> Result<()> {
  args.backend.ensure_host_supported()?;

  if !args.file.is_file() {
    bail!("build description not found: {}", args.file.display());
  }
  let description = Description::load(&args.file)?;

  let exec_mode = if args.serial {
    ExecMode::Serial
  } else {
    ExecMode::detect()
  };

  let options = BuildOptions {
    backend: args.backend,
    mode: args.mode,
    description: args.file,
    root_dir: args.root,
    exec_mode: Some(exec_mode),
    clean: args.clean,
    fetch: args.fetch,
  };
  debug!(?options, "build options");

  let rt = match exec_mode {
    ExecMode::Serial => tokio::runtime::Builder::new_current_thread().enable_all().build(),
    ExecMode::Parallel => tokio::runtime::Builder::new_multi_thread()
      .worker_threads(exec_mode.worker_threads(description.libraries.len()))
      .enable_all()
      .build(),
  }
  .context("Failed to create async runtime")?;

  let report = rt.block_on(run_build(&options)).context("Build failed")?;
  print_report(&report);

  Ok(())
}

fn print_report(report: &BuildReport) {
  for outcome in &report.outcomes {
    let archived = if outcome.archived { ", archived" } else { "" };
    print_info(&format!(
      "{}: {} compiled, {} cached, {} removed{} ({})",
      outcome.name,
      outcome.compiled,
      outcome.cached,
      outcome.evicted,
      archived,
      format_duration(outcome.elapsed)
    ));
  }

  println!();
  print_success("Build complete");
  print_stat("Output", &report.out_dir.display().to_string());
  print_stat("Libraries", &report.outcomes.len().to_string());
  print_stat("Compiled", &report.compiled().to_string());
  print_stat("Cached", &report.cached().to_string());
  if let Some(executable) = &report.executable {
    print_stat("Executable", &executable.display().to_string());
  }
  print_stat("Total", &format_duration(report.elapsed));
}
