use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Kill,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerStartArgs {
    pub cmd: String,
    pub args: Vec<String>,
    /// Added on top of the inherited parent environment.
    pub envs: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
}

/// What one spawn of a task's script produced.
#[derive(Debug, Clone, Default)]
pub struct AttemptOutcome {
    /// `None` when the process was killed by a signal or never started.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub spawn_error: Option<String>,
    pub stdout_tail: String,
    pub stderr_tail: String,
    pub duration: Duration,
}

impl AttemptOutcome {
    pub fn spawn_failed(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            spawn_error: Some(message.into()),
            duration,
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.spawn_error.is_none() && self.exit_code == Some(0)
    }

    /// Captured stdout followed by stderr, as the classifier sees it.
    pub fn diagnostics(&self) -> String {
        let mut joined = String::with_capacity(self.stdout_tail.len() + self.stderr_tail.len() + 1);
        joined.push_str(&self.stdout_tail);
        if !joined.is_empty() && !joined.ends_with('\n') {
            joined.push('\n');
        }
        joined.push_str(&self.stderr_tail);
        joined
    }

    /// Short human description of why the attempt failed.
    pub fn failure_reason(&self) -> String {
        if let Some(e) = &self.spawn_error {
            return format!("spawn failed: {e}");
        }
        if self.timed_out {
            return format!("timed out after {:.1}s", self.duration.as_secs_f64());
        }
        match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}
