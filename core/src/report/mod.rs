//! Uniform scoped log lines and the end-of-run summary.
mod format;
pub mod log;
mod summary;

pub use format::{level_name, render_line, LogScope, ScopedLineFormat};
pub use summary::RunSummary;
