use serde::{Deserialize, Serialize};

use crate::classify::ErrorType;
use crate::quality::GateStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Fail,
    Skip,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Success => "success",
            TaskStatus::Fail => "fail",
            TaskStatus::Skip => "skip",
        }
    }
}

/// Final record for one executed or skipped task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    pub elapsed_seconds: f64,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
    /// Spawns performed; 0 for skipped tasks.
    pub attempts: u32,
    pub outputs_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<GateStatus>,
}

/// Per-task lifecycle:
/// `Pending -> Running -> (Succeeded | Retrying -> Running | Failed | Skipped)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running { attempt: u32 },
    Retrying { attempt: u32 },
    Succeeded,
    Failed,
    Skipped,
}

impl TaskState {
    pub fn can_transition_to(self, to: TaskState) -> bool {
        match (self, to) {
            (TaskState::Pending, TaskState::Running { attempt: 1 }) => true,
            (TaskState::Pending, TaskState::Skipped) => true,
            (TaskState::Running { .. }, TaskState::Succeeded | TaskState::Failed) => true,
            (TaskState::Running { attempt: a }, TaskState::Retrying { attempt: b }) => a == b,
            (TaskState::Retrying { attempt: a }, TaskState::Running { attempt: b }) => b == a + 1,
            _ => false,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Pending => f.write_str("PENDING"),
            TaskState::Running { attempt } => write!(f, "RUNNING#{attempt}"),
            TaskState::Retrying { attempt } => write!(f, "RETRYING#{attempt}"),
            TaskState::Succeeded => f.write_str("SUCCESS"),
            TaskState::Failed => f.write_str("FAILED"),
            TaskState::Skipped => f.write_str("SKIPPED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_edges() {
        use TaskState::*;
        assert!(Pending.can_transition_to(Running { attempt: 1 }));
        assert!(Pending.can_transition_to(Skipped));
        assert!(Running { attempt: 1 }.can_transition_to(Retrying { attempt: 1 }));
        assert!(Retrying { attempt: 1 }.can_transition_to(Running { attempt: 2 }));
        assert!(Running { attempt: 2 }.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Succeeded));
        assert!(!Retrying { attempt: 1 }.can_transition_to(Running { attempt: 3 }));
        assert!(!Succeeded.can_transition_to(Running { attempt: 1 }));
        assert!(!Skipped.can_transition_to(Running { attempt: 1 }));
    }
}
