use std::sync::Arc;

use taskmill_core::config::RunConfig;
use taskmill_core::runner::RunnerPlugin;

use crate::runner::process::ProcessRunnerPlugin;

pub fn build_runner(_cfg: &RunConfig) -> Arc<dyn RunnerPlugin> {
    Arc::new(ProcessRunnerPlugin::new())
}
