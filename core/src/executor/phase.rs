use std::path::Path;
use std::time::Instant;

use crate::config::{Phase, TaskDefinition};
use crate::report::log;

const GENERATE_HINTS: [&str; 5] = ["generate", "build", "render", "page", "site"];

/// Explicit `type` wins; otherwise guessed from the task id and script file name.
pub fn classify_phase(def: &TaskDefinition) -> Phase {
    if let Some(phase) = def.phase {
        return phase;
    }
    let script = Path::new(&def.script)
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let haystack = format!("{} {script}", def.id.to_lowercase());

    if haystack.contains("tag") {
        Phase::Tagging
    } else if GENERATE_HINTS.iter().any(|h| haystack.contains(h)) {
        Phase::Generate
    } else {
        Phase::Scrape
    }
}

/// Brackets runs of consecutive same-phase tasks with start/done log lines.
#[derive(Debug, Default)]
pub struct PhaseTracker {
    current: Option<(Phase, Instant, usize)>,
}

impl PhaseTracker {
    pub fn enter(&mut self, phase: Phase) {
        if let Some((p, _, n)) = self.current.as_mut() {
            if *p == phase {
                *n += 1;
                return;
            }
        }
        self.finish();
        log::phase(format!("{phase} start"));
        self.current = Some((phase, Instant::now(), 1));
    }

    pub fn finish(&mut self) {
        if let Some((phase, started, tasks)) = self.current.take() {
            log::phase(format!(
                "{phase} done: {tasks} task(s) in {:.1}s",
                started.elapsed().as_secs_f64()
            ));
        }
    }
}
