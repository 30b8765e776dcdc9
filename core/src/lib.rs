//! taskmill core: config model, dependency resolution, error classification,
//! child-process attempts, output change detection, quality gate and the
//! sequential run engine.
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod outputs;
pub mod quality;
pub mod report;
pub mod runner;
pub mod util;

pub use classify::ErrorType;
pub use config::{RunConfig, TaskDefinition};
pub use context::RunContext;
pub use executor::{TaskResult, TaskStatus};
pub use report::RunSummary;
