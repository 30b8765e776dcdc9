//! Child process plumbing: the plugin seam, stdout/stderr pumps and a single
//! timed attempt.
mod io_pump;
pub mod retry;
mod runtime;
mod traits;
pub mod types;

pub use io_pump::{LineStream, LineTap};
pub use runtime::{run_attempt, AttemptInput, DEFAULT_CAPTURE_BYTES};
pub use traits::{RunnerPlugin, RunnerSession};
pub use types::{AttemptOutcome, RunnerStartArgs, Signal};
