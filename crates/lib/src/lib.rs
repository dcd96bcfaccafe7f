//! kiln-lib: an incremental, parallel build engine for C and C++ static libraries.
//!
//! The main pieces:
//! - [`toolchain`]: exact command lines for gcc, clang and MSVC
//! - [`cache`]: the compile cache that lets unchanged objects be reused
//! - [`execute`]: the per-target pipeline and the cross-target scheduler
//! - [`driver`]: a whole run driven by a [`description`] file

pub mod cache;
pub mod consts;
pub mod description;
pub mod driver;
pub mod execute;
pub mod link;
pub mod platform;
pub mod prepare;
pub mod process;
pub mod project;
pub mod target;
pub mod toolchain;
pub mod util;

pub use driver::{BuildError, BuildOptions, BuildReport, run_build};
