//! gcc and clang share one flag dialect.

use super::{BuildMode, OutputKind, Toolchain};

pub(super) static GCC: Gnu = Gnu {
  program: "gcc",
  preprocessed_input_flag: Some("-fpreprocessed"),
};

pub(super) static CLANG: Gnu = Gnu {
  program: "clang",
  preprocessed_input_flag: None,
};

/// A GNU-style driver.
#[derive(Debug)]
pub struct Gnu {
  program: &'static str,
  preprocessed_input_flag: Option<&'static str>,
}

impl Toolchain for Gnu {
  fn program(&self) -> &'static str {
    self.program
  }

  fn optimization_flag(&self, mode: BuildMode) -> &'static str {
    match mode {
      BuildMode::Debug => "-g",
      BuildMode::Release => "-Ofast",
    }
  }

  fn preprocess_flags(&self, _output: &str) -> String {
    "-E".to_string()
  }

  fn preprocessed_input_flag(&self) -> Option<&'static str> {
    self.preprocessed_input_flag
  }

  fn compile_only_flag(&self) -> &'static str {
    "-c"
  }

  fn io_args(&self, input: &str, output: &str, _kind: OutputKind) -> String {
    format!("{input} -o {output}")
  }

  fn link_mode_flags(&self) -> Option<&'static str> {
    None
  }

  fn archive_command(&self, library: &str, objects: &[String]) -> String {
    // Windows clang produces COFF objects; archive them with the system librarian.
    if cfg!(windows) {
      format!("lib /nologo -out:{library} {}", objects.join(" "))
    } else {
      format!("ar rcs {library} {}", objects.join(" "))
    }
  }
}
