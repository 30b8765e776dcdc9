//! Post-success data quality gate over event-data artifacts.
mod evaluate;
mod summary;

pub use evaluate::{classify_rate, QualityGate, DATE_FIELDS};
pub use summary::{QualitySummary, QualityTotals};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Ok,
    Warn,
    Fail,
}

impl GateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GateStatus::Ok => "ok",
            GateStatus::Warn => "warn",
            GateStatus::Fail => "fail",
        }
    }
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warn: f64,
    pub fail: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityGateResult {
    pub task_id: String,
    pub status: GateStatus,
    pub detail: String,
    pub checked_outputs: Vec<String>,
    pub total_events: usize,
    pub missing_title_count: usize,
    pub missing_date_count: usize,
    pub title_missing_rate: f64,
    pub date_missing_rate: f64,
    pub title_thresholds: Thresholds,
    pub date_thresholds: Thresholds,
}
