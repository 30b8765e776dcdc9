//! Orchestration: dependency ordering, per-task lifecycle and the sequential
//! run loop.
mod engine;
mod graph;
mod phase;
mod task;
mod types;

pub use engine::{execute_plan, plan_run, restrict_plan, run, run_all, PlanOutcome};
pub use graph::{order_tasks, ResolvedOrder};
pub use phase::{classify_phase, PhaseTracker};
pub use task::run_task;
pub use types::{TaskResult, TaskState, TaskStatus};
