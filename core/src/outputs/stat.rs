use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::expand_path;
use crate::util::time::system_time_ms;

/// Metadata of one declared output. Absent paths carry `exists: false` and
/// null size/mtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputStat {
    pub path: String,
    pub exists: bool,
    pub modified_at_ms: Option<i64>,
    pub size_bytes: Option<u64>,
}

impl OutputStat {
    pub fn missing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            exists: false,
            modified_at_ms: None,
            size_bytes: None,
        }
    }
}

pub fn snapshot_one(path: &str) -> OutputStat {
    let resolved = expand_path(path);
    match std::fs::metadata(Path::new(&resolved)) {
        Ok(meta) => OutputStat {
            path: path.to_string(),
            exists: true,
            modified_at_ms: meta.modified().ok().and_then(system_time_ms),
            size_bytes: Some(meta.len()),
        },
        Err(_) => OutputStat::missing(path),
    }
}

/// Never fails: unreadable or missing paths yield a missing stat.
pub fn snapshot(outputs: &[String]) -> Vec<OutputStat> {
    outputs.iter().map(|p| snapshot_one(p)).collect()
}

/// Different length or any positional difference counts as a change.
pub fn changed(before: &[OutputStat], after: &[OutputStat]) -> bool {
    before.len() != after.len() || before.iter().zip(after).any(|(a, b)| a != b)
}
