#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use taskmill_core::classify::classify;
use taskmill_core::config::{parse_config, ConfigFormat};
use taskmill_core::executor::run_all;
use taskmill_core::outputs::OutputCache;
use taskmill_core::quality::GateStatus;
use taskmill_core::runner::{run_attempt, AttemptInput, RunnerStartArgs, DEFAULT_CAPTURE_BYTES};
use taskmill_core::{ErrorType, RunContext, TaskStatus};
use taskmill_plugins::runner::ProcessRunnerPlugin;

fn sh(script: &str) -> RunnerStartArgs {
    RunnerStartArgs {
        cmd: "sh".into(),
        args: vec!["-c".into(), script.into()],
        envs: Default::default(),
        cwd: None,
    }
}

fn input(timeout: Option<Duration>) -> AttemptInput<'static> {
    AttemptInput {
        task_id: "t",
        timeout,
        capture_bytes: DEFAULT_CAPTURE_BYTES,
        route_to_log: true,
    }
}

#[tokio::test]
async fn captures_exit_code_and_streams() {
    let plugin = ProcessRunnerPlugin::new();
    let outcome = run_attempt(
        &plugin,
        &sh("echo hello; echo 'ERROR_TYPE=PARSE' >&2; exit 3"),
        input(None),
    )
    .await;
    assert_eq!(outcome.exit_code, Some(3));
    assert_eq!(outcome.stdout_tail, "hello\n");
    assert_eq!(outcome.stderr_tail, "ERROR_TYPE=PARSE\n");
    assert_eq!(classify(&outcome), ErrorType::Parse);
}

#[tokio::test]
async fn exit_code_alone_signals_the_kind() {
    let plugin = ProcessRunnerPlugin::new();
    let outcome = run_attempt(&plugin, &sh("exit 10"), input(None)).await;
    assert_eq!(classify(&outcome), ErrorType::Network);
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let plugin = ProcessRunnerPlugin::new();
    let outcome = run_attempt(
        &plugin,
        &sh("exec sleep 5"),
        input(Some(Duration::from_millis(200))),
    )
    .await;
    assert!(outcome.timed_out);
    assert_eq!(outcome.exit_code, None);
    assert!(outcome.duration < Duration::from_secs(4));
    assert_eq!(classify(&outcome), ErrorType::Network);
}

#[tokio::test]
async fn missing_script_is_a_spawn_failure() {
    let plugin = ProcessRunnerPlugin::new();
    let start = RunnerStartArgs {
        cmd: "./definitely-not-here.sh".into(),
        args: vec![],
        envs: Default::default(),
        cwd: None,
    };
    let outcome = run_attempt(&plugin, &start, input(None)).await;
    assert!(outcome.spawn_error.is_some());
    assert_eq!(classify(&outcome), ErrorType::Unknown);
}

#[tokio::test]
async fn env_and_cwd_reach_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let mut start = sh("printf '%s %s' \"$VENUE\" \"$(pwd)\"");
    start.envs.insert("VENUE".into(), "hall".into());
    start.cwd = Some(dir.path().to_path_buf());

    let outcome = run_attempt(&ProcessRunnerPlugin::new(), &start, input(None)).await;
    assert!(outcome.succeeded());
    let cwd = dir.path().canonicalize().unwrap();
    assert_eq!(outcome.stdout_tail, format!("hall {}", cwd.display()));
}

#[tokio::test]
async fn empty_event_artifact_warns_and_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let events = dir.path().join("venue-events.json");
    let text = format!(
        r#"
stateDir = "{state}"

[[tasks]]
id = "venue"
script = "sh"
args = ["-c", "printf '{{\"events\": []}}' > \"$OUT\""]
outputs = ["{events}"]
env = {{ OUT = "{events}" }}
"#,
        state = dir.path().join("state").display(),
        events = events.display(),
    );
    let cfg = parse_config(&text, ConfigFormat::Toml, &dir.path().join("taskmill.toml")).unwrap();
    let mut ctx = RunContext::with_cache(
        Arc::new(cfg),
        Arc::new(ProcessRunnerPlugin::new()),
        OutputCache::default(),
    );

    let summary = run_all(&mut ctx).await.unwrap();
    assert_eq!(summary.tasks[0].status, TaskStatus::Success);
    assert_eq!(summary.tasks[0].quality, Some(GateStatus::Warn));
    assert_eq!(summary.exit_code(), 0);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&events).unwrap()).unwrap();
    assert_eq!(written, serde_json::json!({"events": []}));
}
