//! Target execution.
//!
//! [`pipeline`] builds one library target through its preprocess, compile,
//! evict and archive stages. [`scheduler`] runs one pipeline per target,
//! either all at once or one after another, and merges what they produced.

pub mod pipeline;
pub mod scheduler;
pub mod types;

pub use pipeline::{build_target, expand_sources};
pub use scheduler::{ExecMode, ScheduleError, ScheduleReport, run_jobs};
pub use types::{PipelineError, TargetOutcome};
