use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::QualityGateConfig;
use crate::util::fs::write_json_atomic;

use super::{GateStatus, QualityGateResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityTotals {
    pub checked_tasks: usize,
    pub ok: usize,
    pub warn: usize,
    pub fail: usize,
}

/// Per-run quality artifact written next to the output cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySummary {
    pub generated_at: DateTime<Local>,
    pub quality_gate: QualityGateConfig,
    pub totals: QualityTotals,
    pub tasks: Vec<QualityGateResult>,
}

impl QualitySummary {
    pub fn build(
        generated_at: DateTime<Local>,
        config: &QualityGateConfig,
        results: Vec<QualityGateResult>,
    ) -> Self {
        let mut totals = QualityTotals {
            checked_tasks: results.len(),
            ..QualityTotals::default()
        };
        for r in &results {
            match r.status {
                GateStatus::Ok => totals.ok += 1,
                GateStatus::Warn => totals.warn += 1,
                GateStatus::Fail => totals.fail += 1,
            }
        }
        Self {
            generated_at,
            quality_gate: config.clone(),
            totals,
            tasks: results,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
            .with_context(|| format!("failed to write quality summary {}", path.display()))
    }
}
