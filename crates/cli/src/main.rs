mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kiln_lib::consts::{APP_NAME, DEFAULT_DESCRIPTION};
use kiln_lib::toolchain::{Backend, BuildMode};

use cmd::BuildArgs;

/// Incremental, parallel builds of C and C++ static libraries
#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Compiler backend: gcc or clang on Unix, msvc or clang on Windows
  backend: Backend,

  /// Build mode: debug or release
  mode: BuildMode,

  /// Build description file
  #[arg(short, long, default_value = DEFAULT_DESCRIPTION)]
  file: PathBuf,

  /// Project root (default: the directory of the description file)
  #[arg(long)]
  root: Option<PathBuf>,

  /// Run library builds one after another
  #[arg(long)]
  serial: bool,

  /// Delete existing object files before building
  #[arg(long)]
  clean: bool,

  /// Do not clone missing library sources
  #[arg(long)]
  no_fetch: bool,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("kiln=debug,kiln_lib=debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kiln=info,kiln_lib=info"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  cmd::cmd_build(BuildArgs {
    backend: cli.backend,
    mode: cli.mode,
    file: cli.file,
    root: cli.root,
    serial: cli.serial,
    clean: cli.clean,
    fetch: !cli.no_fetch,
  })
}
