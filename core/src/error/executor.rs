use thiserror::Error;

/// Dependency graph problems found while ordering tasks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("task '{task_id}' depends on unknown task '{missing_dep}'")]
    UnknownDependency {
        task_id: String,
        missing_dep: String,
    },

    #[error("circular dependency detected: {0}")]
    CircularDependency(String),
}

/// Planning-time failure: the run aborts with zero tasks executed.
#[derive(Error, Debug)]
#[error("dependency resolution failed: {}", join_errors(.0))]
pub struct PlanError(pub Vec<ResolveError>);

fn join_errors(errors: &[ResolveError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
