//! Logging setup and run summaries.

mod logging;
mod summary;

pub use logging::{env_filter, init_logging, LogFormat, Verbosity, LOG_FORMAT_ENV};
pub use summary::{emit_run_summary, RunStatus, RunSummary};
