//! The MSVC `cl` driver.

use super::{BuildMode, OutputKind, Toolchain};

#[derive(Debug)]
pub struct Msvc;

/// Replace the extension of the last path segment, leaving the rest untouched.
fn with_extension(path: &str, ext: &str) -> String {
  let segment_start = path.rfind(['/', '\\']).map_or(0, |i| i + 1);
  match path[segment_start..].rfind('.') {
    Some(dot) => format!("{}.{ext}", &path[..segment_start + dot]),
    None => format!("{path}.{ext}"),
  }
}

impl Toolchain for Msvc {
  fn program(&self) -> &'static str {
    "cl /nologo /diagnostics:column /FC"
  }

  fn optimization_flag(&self, mode: BuildMode) -> &'static str {
    match mode {
      BuildMode::Debug => "/Zi",
      BuildMode::Release => "/O2",
    }
  }

  fn preprocess_flags(&self, output: &str) -> String {
    format!("/P /Fi{output}")
  }

  fn preprocessed_input_flag(&self) -> Option<&'static str> {
    Some("/Yc")
  }

  fn compile_only_flag(&self) -> &'static str {
    "/c"
  }

  fn io_args(&self, input: &str, output: &str, kind: OutputKind) -> String {
    match kind {
      // /Fi already names the output.
      OutputKind::Preprocessed => input.to_string(),
      OutputKind::Object => format!("{input} /Fo{output} /Fd{}", with_extension(output, "pdb")),
      OutputKind::Linked => format!(
        "{input} /Fo{} /Fe{output} /Fd{}",
        with_extension(output, "obj"),
        with_extension(output, "pdb")
      ),
    }
  }

  fn link_mode_flags(&self) -> Option<&'static str> {
    Some("/link -incremental:no")
  }

  fn archive_command(&self, library: &str, objects: &[String]) -> String {
    format!("lib /nologo -out:{library} {}", objects.join(" "))
  }
}
