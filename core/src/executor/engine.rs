use std::collections::HashSet;
use std::time::Instant;

use crate::config::RunConfig;
use crate::context::RunContext;
use crate::error::PlanError;
use crate::quality::QualitySummary;
use crate::report::{log, RunSummary};
use crate::util::time::round_secs;

use super::graph::order_tasks;
use super::phase::{classify_phase, PhaseTracker};
use super::task::run_task;
use super::types::{TaskResult, TaskStatus};

/// Orders the full task set. Any resolution error aborts before anything runs;
/// the caller reports the returned [`PlanError`].
pub fn plan_run(config: &RunConfig) -> Result<Vec<String>, PlanError> {
    order_tasks(&config.tasks).into_result()
}

/// Narrows a full order to enabled tasks, and to `selected` when given.
/// Edges into dropped tasks count as satisfied.
pub fn restrict_plan(
    config: &RunConfig,
    order: &[String],
    selected: Option<&HashSet<String>>,
) -> Vec<String> {
    let keep = |id: &str| {
        config.task(id).is_some_and(|t| t.enabled)
            && selected.map_or(true, |s| s.contains(id))
    };
    let plan: Vec<String> = order.iter().filter(|id| keep(id.as_str())).cloned().collect();

    for id in &plan {
        if let Some(def) = config.task(id) {
            for dep in def.depends_on.iter().filter(|d| !keep(d.as_str())) {
                log::debug(format!("{id}: dependency {dep} is not in this run"));
            }
        }
    }
    plan
}

#[derive(Debug, Clone, Default)]
pub struct PlanOutcome {
    pub results: Vec<TaskResult>,
    /// Ids never started because `stopOnError` halted the run.
    pub abandoned: Vec<String>,
}

/// Runs `plan` strictly in order, one task at a time.
pub async fn execute_plan(plan: &[String], ctx: &mut RunContext) -> PlanOutcome {
    let config = ctx.shared_config();
    let settings = &config.settings;
    let mut outcome = PlanOutcome::default();
    let mut phases = PhaseTracker::default();

    for (i, id) in plan.iter().enumerate() {
        let Some(def) = config.task(id) else {
            log::warn(format!("planned task {id} is not in the config; skipping"));
            continue;
        };
        phases.enter(classify_phase(def));

        let result = run_task(def, ctx).await;
        let status = result.status;
        outcome.results.push(result);

        if status == TaskStatus::Fail && settings.stop_on_error && !def.continue_on_error {
            outcome.abandoned = plan[i + 1..].to_vec();
            log::error(format!(
                "stopOnError: {id} failed, abandoning {} remaining task(s)",
                outcome.abandoned.len()
            ));
            break;
        }

        let is_last = i + 1 == plan.len();
        if !is_last && status != TaskStatus::Skip {
            let pause = def.sleep_after(settings);
            if !pause.is_zero() {
                log::debug(format!("sleeping {:.1}s after {id}", pause.as_secs_f64()));
                tokio::time::sleep(pause).await;
            }
        }
    }

    phases.finish();
    outcome
}

/// Executes `plan`, persists the output cache and quality summary, and
/// emits the run summary.
pub async fn run(plan: &[String], ctx: &mut RunContext) -> RunSummary {
    let started = Instant::now();
    log::run(format!(
        "run {} started: {} task(s) from {} via {} runner",
        ctx.run_id(),
        plan.len(),
        ctx.config().source.display(),
        ctx.runner().name()
    ));

    let outcome = execute_plan(plan, ctx).await;

    let config = ctx.shared_config();
    if let Err(e) = ctx.cache.save(&config.output_cache_path()) {
        log::warn(format!("{e:#}"));
    }
    let quality = QualitySummary::build(
        chrono::Local::now(),
        config.quality_gate.config(),
        ctx.quality_results().to_vec(),
    );
    if let Err(e) = quality.save(&config.quality_summary_path()) {
        log::warn(format!("{e:#}"));
    }

    let summary = RunSummary::from_results(
        ctx.run_id(),
        ctx.started_at(),
        round_secs(started.elapsed()),
        outcome.results,
        outcome.abandoned,
        quality.totals,
    );
    summary.emit();
    summary
}

/// Plans every enabled task and runs it, with no selection step.
pub async fn run_all(ctx: &mut RunContext) -> Result<RunSummary, PlanError> {
    let config = ctx.shared_config();
    let order = plan_run(&config)?;
    let plan = restrict_plan(&config, &order, None);
    Ok(run(&plan, ctx).await)
}
