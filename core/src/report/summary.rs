use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::classify::ErrorType;
use crate::executor::{TaskResult, TaskStatus};
use crate::quality::QualityTotals;

use super::log;

/// Machine-readable end-of-run report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Local>,
    pub elapsed_seconds: f64,
    pub success: usize,
    pub fail: usize,
    pub skip: usize,
    pub failures_by_kind: BTreeMap<ErrorType, usize>,
    pub failed_task_ids: Vec<String>,
    pub abandoned_task_ids: Vec<String>,
    pub quality: QualityTotals,
    pub tasks: Vec<TaskResult>,
}

impl RunSummary {
    pub fn from_results(
        run_id: &str,
        started_at: DateTime<Local>,
        elapsed_seconds: f64,
        tasks: Vec<TaskResult>,
        abandoned_task_ids: Vec<String>,
        quality: QualityTotals,
    ) -> Self {
        let mut summary = Self {
            run_id: run_id.to_string(),
            started_at,
            elapsed_seconds,
            success: 0,
            fail: 0,
            skip: 0,
            failures_by_kind: BTreeMap::new(),
            failed_task_ids: Vec::new(),
            abandoned_task_ids,
            quality,
            tasks: Vec::new(),
        };
        for t in &tasks {
            match t.status {
                TaskStatus::Success => summary.success += 1,
                TaskStatus::Skip => summary.skip += 1,
                TaskStatus::Fail => {
                    summary.fail += 1;
                    summary.failed_task_ids.push(t.id.clone());
                    let kind = t.error_type.unwrap_or(ErrorType::Unknown);
                    *summary.failures_by_kind.entry(kind).or_default() += 1;
                }
            }
        }
        summary.tasks = tasks;
        summary
    }

    /// 0 when every executed task succeeded or was skipped.
    pub fn exit_code(&self) -> i32 {
        if self.fail == 0 {
            0
        } else {
            1
        }
    }

    pub fn emit(&self) {
        log::run(format!(
            "finished in {:.1}s: {} success, {} fail, {} skip",
            self.elapsed_seconds, self.success, self.fail, self.skip
        ));
        for t in &self.tasks {
            log::run(format!(
                "  {:<7} {} ({:.1}s) {}",
                t.status.as_str(),
                t.id,
                t.elapsed_seconds,
                t.detail
            ));
        }
        if !self.failures_by_kind.is_empty() {
            let tally = self
                .failures_by_kind
                .iter()
                .map(|(k, n)| format!("{k}={n}"))
                .collect::<Vec<_>>()
                .join(", ");
            log::error(format!("failures by kind: {tally}"));
            log::error(format!("failed tasks: {}", self.failed_task_ids.join(", ")));
        }
        if !self.abandoned_task_ids.is_empty() {
            log::warn(format!(
                "not started: {}",
                self.abandoned_task_ids.join(", ")
            ));
        }
        if self.quality.checked_tasks > 0 {
            log::run(format!(
                "quality: {} checked, {} ok, {} warn, {} fail",
                self.quality.checked_tasks, self.quality.ok, self.quality.warn, self.quality.fail
            ));
        }
        match serde_json::to_string(self) {
            Ok(json) => log::run(format!("summary {json}")),
            Err(e) => log::warn(format!("summary serialization failed: {e}")),
        }
    }
}
