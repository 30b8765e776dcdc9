use std::time::Instant;

use crate::classify::{classify, ErrorType};
use crate::config::TaskDefinition;
use crate::context::RunContext;
use crate::outputs::{changed, snapshot};
use crate::quality::GateStatus;
use crate::report::log;
use crate::runner::{retry, run_attempt, AttemptInput, AttemptOutcome};
use crate::util::tail_chars;
use crate::util::time::round_secs;

use super::types::{TaskResult, TaskState, TaskStatus};

const DETAIL_MAX_CHARS: usize = 300;

/// Runs one task to a terminal state: skip check, attempts with classified
/// retries, quality gate, cache update and hooks.
pub async fn run_task(def: &TaskDefinition, ctx: &mut RunContext) -> TaskResult {
    let started = Instant::now();
    let config = ctx.shared_config();
    let settings = &config.settings;
    let mut state = TaskState::Pending;

    let before = snapshot(&def.outputs);

    if def.skip_if_outputs_unchanged {
        if let Some(cached) = ctx.cache.get(&def.id) {
            if !changed(cached, &before) {
                transition(&def.id, &mut state, TaskState::Skipped);
                log::task(format!(
                    "{} skipped: outputs unchanged since last success",
                    def.id
                ));
                return TaskResult {
                    id: def.id.clone(),
                    name: def.display_name().to_string(),
                    status: TaskStatus::Skip,
                    elapsed_seconds: round_secs(started.elapsed()),
                    detail: "outputs unchanged".to_string(),
                    error_type: None,
                    attempts: 0,
                    outputs_changed: false,
                    quality: None,
                };
            }
        }
    }

    let retries = def.retries(settings);
    let max = retry::max_attempts(retries);
    let start = ctx.start_args(def);
    let runner = ctx.runner();
    let timeout = def.timeout(settings);

    let mut attempt = 0u32;
    let (outcome, mut error_type) = loop {
        attempt += 1;
        transition(&def.id, &mut state, TaskState::Running { attempt });
        log::task(format!(
            "{} attempt {attempt}/{max}: {}",
            def.display_name(),
            start.cmd
        ));

        let outcome = run_attempt(
            runner.as_ref(),
            &start,
            AttemptInput {
                task_id: &def.id,
                timeout,
                capture_bytes: ctx.capture_bytes(),
                route_to_log: settings.log.capture_stdout_stderr,
            },
        )
        .await;

        if outcome.succeeded() {
            break (outcome, None);
        }

        let kind = classify(&outcome);
        let retryable = kind.is_retryable();
        log::error(format!(
            "{} attempt {attempt}/{max} failed: {} [{kind}, retryable={retryable}]",
            def.id,
            outcome.failure_reason()
        ));
        if kind == ErrorType::Parse {
            log::error(format!(
                "{} reported PARSE: the upstream source format has probably changed",
                def.id
            ));
        }

        if retryable && retry::has_attempts_left(attempt, retries) {
            transition(&def.id, &mut state, TaskState::Retrying { attempt });
            let delay = def.retry_delay(settings);
            log::warn(format!(
                "{} retrying in {:.1}s ({} attempt(s) left)",
                def.id,
                delay.as_secs_f64(),
                max - attempt
            ));
            tokio::time::sleep(delay).await;
            continue;
        }
        break (outcome, Some(kind));
    };

    let mut detail = match error_type {
        Some(kind) => failure_detail(kind, &outcome),
        None => format!("exit 0 in {:.1}s", outcome.duration.as_secs_f64()),
    };

    let mut quality = None;
    if error_type.is_none() {
        if let Some(q) = config.quality_gate.evaluate(&def.id, &def.outputs) {
            match q.status {
                GateStatus::Ok => log::task(format!("{} quality ok: {}", def.id, q.detail)),
                GateStatus::Warn => log::warn(format!("{} quality warn: {}", def.id, q.detail)),
                GateStatus::Fail => {
                    log::error(format!("{} quality fail: {}", def.id, q.detail));
                    error_type = Some(ErrorType::Validation);
                    detail = format!("quality gate failed: {}", q.detail);
                }
            }
            quality = Some(q.status);
            ctx.record_quality(q);
        }
    }

    let after = snapshot(&def.outputs);
    let outputs_changed = changed(&before, &after);
    let succeeded = error_type.is_none();

    if succeeded {
        transition(&def.id, &mut state, TaskState::Succeeded);
        ctx.cache.record(&def.id, after);
        if !outputs_changed {
            log::warn(format!("{} succeeded but its outputs did not change", def.id));
        }
        if let Some(hook) = def.on_success.as_deref() {
            log::task(format!("{} onSuccess: {hook}", def.id));
        }
    } else {
        transition(&def.id, &mut state, TaskState::Failed);
        ctx.cache.invalidate(&def.id);
        if let Some(hook) = def.on_failure.as_deref() {
            log::warn(format!("{} onFailure: {hook}", def.id));
        }
    }

    let result = TaskResult {
        id: def.id.clone(),
        name: def.display_name().to_string(),
        status: if succeeded {
            TaskStatus::Success
        } else {
            TaskStatus::Fail
        },
        elapsed_seconds: round_secs(started.elapsed()),
        detail,
        error_type,
        attempts: attempt,
        outputs_changed,
        quality,
    };
    log::task(format!(
        "{} {} in {:.1}s",
        result.id,
        result.status.as_str(),
        result.elapsed_seconds
    ));
    result
}

fn transition(task_id: &str, state: &mut TaskState, to: TaskState) {
    if state.can_transition_to(to) {
        log::debug(format!("{task_id}: {state} -> {to}"));
    } else {
        log::warn(format!("{task_id}: unexpected transition {state} -> {to}"));
    }
    *state = to;
}

/// `"<KIND>: <reason>: <last diagnostic line>"`, bounded.
fn failure_detail(kind: ErrorType, outcome: &AttemptOutcome) -> String {
    let mut detail = format!("{kind}: {}", outcome.failure_reason());
    let last_line = outcome
        .stdout_tail
        .lines()
        .chain(outcome.stderr_tail.lines())
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("ERROR_TYPE="));
    if let Some(line) = last_line {
        detail.push_str(": ");
        detail.push_str(tail_chars(line, DETAIL_MAX_CHARS));
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_detail_prefers_stderr_and_skips_marker() {
        let outcome = AttemptOutcome {
            exit_code: Some(11),
            stdout_tail: "stdout line\n".into(),
            stderr_tail: "bad token at 3\nERROR_TYPE=PARSE\n".into(),
            ..AttemptOutcome::default()
        };
        assert_eq!(
            failure_detail(ErrorType::Parse, &outcome),
            "PARSE: exit code 11: bad token at 3"
        );
    }
}
