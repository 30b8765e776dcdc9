#[allow(clippy::module_inception)]
pub mod error;
pub mod config;
pub mod executor;

pub use config::ConfigError;
pub use error::{CliError, RunnerError};
pub use executor::{PlanError, ResolveError};
