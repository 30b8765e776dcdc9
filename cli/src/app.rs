use std::collections::HashSet;
use std::io;
use std::sync::Arc;

use taskmill_core::config::RunConfig;
use taskmill_core::context::RunContext;
use taskmill_core::error::CliError;
use taskmill_core::executor::{plan_run, restrict_plan, run};
use taskmill_core::report::log;

use crate::commands::cli::Args;
use crate::select;

/// Resolves, optionally narrows and executes the plan. The returned code is
/// the process exit code.
pub async fn run_app(args: &Args, config: RunConfig) -> Result<i32, CliError> {
    if let Some(version) = config.unsupported_version() {
        log::warn(format!(
            "config version {version} is not the supported version {}; continuing",
            taskmill_core::config::CONFIG_VERSION
        ));
    }

    let order = plan_run(&config)?;

    let selected = choose_tasks(args, &config)?;
    let plan = restrict_plan(&config, &order, selected.as_ref());
    if plan.is_empty() {
        log::warn("no enabled tasks selected; nothing to run");
        return Ok(0);
    }

    let runner = taskmill_plugins::factory::build_runner(&config);
    let mut ctx = RunContext::new(Arc::new(config), runner);
    let summary = run(&plan, &mut ctx).await;
    Ok(summary.exit_code())
}

fn choose_tasks(args: &Args, config: &RunConfig) -> Result<Option<HashSet<String>>, CliError> {
    if args.all || !select::is_interactive() {
        return Ok(None);
    }
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    let picked = select::prompt_selection(config, &mut reader, &mut writer)?;
    Ok(Some(picked))
}
