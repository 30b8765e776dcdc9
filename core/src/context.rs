use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::config::{RunConfig, TaskDefinition};
use crate::outputs::OutputCache;
use crate::quality::QualityGateResult;
use crate::runner::{RunnerPlugin, RunnerStartArgs, DEFAULT_CAPTURE_BYTES};
use crate::util::expand_path;

pub const TASK_ID_ENV: &str = "TASKMILL_TASK_ID";
pub const RUN_ID_ENV: &str = "TASKMILL_RUN_ID";

/// Everything one invocation threads through the engine.
pub struct RunContext {
    run_id: String,
    started_at: DateTime<Local>,
    config: Arc<RunConfig>,
    runner: Arc<dyn RunnerPlugin>,
    capture_bytes: usize,
    pub cache: OutputCache,
    quality_results: Vec<QualityGateResult>,
}

impl RunContext {
    /// Loads the output cache from the config's state dir.
    pub fn new(config: Arc<RunConfig>, runner: Arc<dyn RunnerPlugin>) -> Self {
        let cache = OutputCache::load(&config.output_cache_path());
        Self::with_cache(config, runner, cache)
    }

    pub fn with_cache(
        config: Arc<RunConfig>,
        runner: Arc<dyn RunnerPlugin>,
        cache: OutputCache,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Local::now(),
            config,
            runner,
            capture_bytes: DEFAULT_CAPTURE_BYTES,
            cache,
            quality_results: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<RunConfig> {
        self.config.clone()
    }

    pub fn runner(&self) -> Arc<dyn RunnerPlugin> {
        self.runner.clone()
    }

    pub fn capture_bytes(&self) -> usize {
        self.capture_bytes
    }

    pub fn record_quality(&mut self, result: QualityGateResult) {
        self.quality_results.push(result);
    }

    pub fn quality_results(&self) -> &[QualityGateResult] {
        &self.quality_results
    }

    /// Command line and environment for one spawn of `def`.
    ///
    /// Environment layering, later wins: `TZ` from `timezone`, global `env`,
    /// task `env`, then the run/task id variables.
    pub fn start_args(&self, def: &TaskDefinition) -> RunnerStartArgs {
        let settings = &self.config.settings;
        let mut envs = std::collections::BTreeMap::new();
        if let Some(tz) = settings.timezone.as_deref().filter(|s| !s.trim().is_empty()) {
            envs.insert("TZ".to_string(), tz.trim().to_string());
        }
        envs.extend(settings.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        envs.extend(def.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        envs.insert(TASK_ID_ENV.to_string(), def.id.clone());
        envs.insert(RUN_ID_ENV.to_string(), self.run_id.clone());

        RunnerStartArgs {
            cmd: expand_path(&def.script),
            args: def.args.clone(),
            envs,
            cwd: def
                .cwd
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .map(|c| PathBuf::from(expand_path(c))),
        }
    }
}
