use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::report::log;
use crate::util::fs::write_json_atomic;

use super::stat::OutputStat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub outputs: Vec<OutputStat>,
}

/// Task id -> output snapshot after that task's last successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl OutputCache {
    /// Missing or corrupt files load as an empty cache.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                log::warn(format!(
                    "output cache {} unreadable ({e}); starting empty",
                    path.display()
                ));
                return Self::default();
            }
        };
        match serde_json::from_str::<Self>(&text) {
            Ok(cache) => cache,
            Err(e) => {
                log::warn(format!(
                    "output cache {} is corrupt ({e}); starting empty",
                    path.display()
                ));
                Self::default()
            }
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&[OutputStat]> {
        self.entries.get(task_id).map(|e| e.outputs.as_slice())
    }

    pub fn record(&mut self, task_id: &str, outputs: Vec<OutputStat>) {
        self.entries
            .insert(task_id.to_string(), CacheEntry { outputs });
    }

    pub fn invalidate(&mut self, task_id: &str) {
        self.entries.remove(task_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
            .with_context(|| format!("failed to write output cache {}", path.display()))
    }
}
