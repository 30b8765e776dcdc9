//! One attempt of a task: spawn through the plugin, pump stdout/stderr into
//! ring buffers, enforce the timeout and normalise the exit.
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::report::log;
use crate::util::RingBytes;

use super::io_pump::{self, Forward, LineTap};
use super::traits::RunnerPlugin;
use super::types::{AttemptOutcome, RunnerStartArgs, Signal};

/// Bytes of stdout and of stderr kept for diagnostics and classification.
pub const DEFAULT_CAPTURE_BYTES: usize = 128 * 1024;

const LINE_TAP_CHANNEL_CAPACITY: usize = 1024;

/// How long to wait for pipes to close once the child has exited.
const STREAM_DRAIN_GRACE: Duration = Duration::from_secs(2);

pub struct AttemptInput<'a> {
    pub task_id: &'a str,
    pub timeout: Option<Duration>,
    pub capture_bytes: usize,
    /// Send child output through the logger instead of copying it raw.
    pub route_to_log: bool,
}

pub async fn run_attempt(
    plugin: &dyn RunnerPlugin,
    start: &RunnerStartArgs,
    input: AttemptInput<'_>,
) -> AttemptOutcome {
    let started_at = Instant::now();

    let mut session = match plugin.start_session(start).await {
        Ok(s) => s,
        Err(e) => {
            return AttemptOutcome::spawn_failed(
                format!("{}: {e:#}", start.cmd),
                started_at.elapsed(),
            )
        }
    };

    let ring_out = RingBytes::new(input.capture_bytes);
    let ring_err = RingBytes::new(input.capture_bytes);

    let (line_tx, mut line_rx) = mpsc::channel::<LineTap>(LINE_TAP_CHANNEL_CAPACITY);
    let forward = || {
        if input.route_to_log {
            Forward::Lines(line_tx.clone())
        } else {
            Forward::Raw
        }
    };

    let mut pumps = Vec::with_capacity(2);
    if let Some(rd) = session.stdout() {
        pumps.push(io_pump::pump_stdout(rd, ring_out.clone(), forward()));
    }
    if let Some(rd) = session.stderr() {
        pumps.push(io_pump::pump_stderr(rd, ring_err.clone(), forward()));
    }
    drop(line_tx);

    let task_id = input.task_id.to_string();
    let tap_task = tokio::spawn(async move {
        while let Some(tap) = line_rx.recv().await {
            log::child_output(&task_id, tap.stream, &tap.line);
        }
    });

    let (exit_code, timed_out) = match input.timeout {
        Some(limit) => match tokio::time::timeout(limit, session.wait()).await {
            Ok(res) => (exit_code_of(res, input.task_id), false),
            Err(_) => {
                log::warn(format!(
                    "{} exceeded timeout of {:.1}s, terminating",
                    input.task_id,
                    limit.as_secs_f64()
                ));
                if let Err(e) = session.signal(Signal::Kill).await {
                    log::warn(format!("{}: kill failed: {e:#}", input.task_id));
                }
                (exit_code_of(session.wait().await, input.task_id), true)
            }
        },
        None => (exit_code_of(session.wait().await, input.task_id), false),
    };

    let aborts: Vec<_> = pumps.iter().map(|h| h.abort_handle()).collect();
    match tokio::time::timeout(STREAM_DRAIN_GRACE, futures::future::join_all(pumps)).await {
        Ok(results) => {
            for res in results {
                match res {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => log::warn(format!("{}: {e}", input.task_id)),
                    Err(e) => log::warn(format!("{}: output pump failed: {e}", input.task_id)),
                }
            }
        }
        Err(_) => {
            for a in &aborts {
                a.abort();
            }
            log::warn(format!(
                "{}: output streams still open after exit, detaching",
                input.task_id
            ));
        }
    }
    let _ = tap_task.await;

    AttemptOutcome {
        exit_code,
        timed_out,
        spawn_error: None,
        stdout_tail: ring_out.to_string_lossy(),
        stderr_tail: ring_err.to_string_lossy(),
        duration: started_at.elapsed(),
    }
}

fn exit_code_of(res: anyhow::Result<Option<i32>>, task_id: &str) -> Option<i32> {
    match res {
        Ok(code) => code,
        Err(e) => {
            log::warn(format!("{task_id}: wait failed: {e:#}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::io::AsyncRead;

    use super::*;
    use crate::runner::RunnerSession;

    struct FakeSession {
        stdout: Option<Vec<u8>>,
        stderr: Option<Vec<u8>>,
        exit: Option<i32>,
        hang: bool,
        killed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RunnerSession for FakeSession {
        fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
            self.stdout
                .take()
                .map(|b| Box::new(std::io::Cursor::new(b)) as Box<dyn AsyncRead + Unpin + Send>)
        }

        fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
            self.stderr
                .take()
                .map(|b| Box::new(std::io::Cursor::new(b)) as Box<dyn AsyncRead + Unpin + Send>)
        }

        async fn signal(&mut self, _signal: Signal) -> anyhow::Result<()> {
            self.killed.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn wait(&mut self) -> anyhow::Result<Option<i32>> {
            while self.hang && !self.killed.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            if self.killed.load(Ordering::SeqCst) {
                return Ok(None);
            }
            Ok(self.exit)
        }
    }

    struct FakePlugin {
        exit: Option<i32>,
        hang: bool,
        fail_spawn: bool,
        killed: Arc<AtomicBool>,
    }

    impl FakePlugin {
        fn exiting(code: i32) -> Self {
            Self {
                exit: Some(code),
                hang: false,
                fail_spawn: false,
                killed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl RunnerPlugin for FakePlugin {
        fn name(&self) -> &str {
            "fake"
        }

        async fn start_session(
            &self,
            _args: &RunnerStartArgs,
        ) -> anyhow::Result<Box<dyn RunnerSession>> {
            if self.fail_spawn {
                anyhow::bail!("No such file or directory");
            }
            Ok(Box::new(FakeSession {
                stdout: Some(b"fetched 12 events\n".to_vec()),
                stderr: Some(b"ERROR_TYPE=PARSE\n".to_vec()),
                exit: self.exit,
                hang: self.hang,
                killed: self.killed.clone(),
            }))
        }
    }

    fn start() -> RunnerStartArgs {
        RunnerStartArgs {
            cmd: "scripts/venue.sh".into(),
            args: vec![],
            envs: Default::default(),
            cwd: None,
        }
    }

    fn input(timeout: Option<Duration>) -> AttemptInput<'static> {
        AttemptInput {
            task_id: "venue",
            timeout,
            capture_bytes: DEFAULT_CAPTURE_BYTES,
            route_to_log: true,
        }
    }

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let plugin = FakePlugin::exiting(11);
        let outcome = run_attempt(&plugin, &start(), input(None)).await;
        assert_eq!(outcome.exit_code, Some(11));
        assert!(!outcome.timed_out);
        assert!(!outcome.succeeded());
        assert_eq!(outcome.stdout_tail, "fetched 12 events\n");
        assert_eq!(outcome.stderr_tail, "ERROR_TYPE=PARSE\n");
    }

    #[tokio::test]
    async fn timeout_kills_and_marks_attempt() {
        let plugin = FakePlugin {
            hang: true,
            ..FakePlugin::exiting(0)
        };
        let outcome = run_attempt(&plugin, &start(), input(Some(Duration::from_millis(30)))).await;
        assert!(outcome.timed_out);
        assert!(plugin.killed.load(Ordering::SeqCst));
        assert_eq!(outcome.exit_code, None);
        assert!(!outcome.succeeded());
    }

    #[tokio::test]
    async fn spawn_failure_is_reported_not_raised() {
        let plugin = FakePlugin {
            fail_spawn: true,
            ..FakePlugin::exiting(0)
        };
        let outcome = run_attempt(&plugin, &start(), input(None)).await;
        let err = outcome.spawn_error.as_deref().unwrap();
        assert!(err.contains("scripts/venue.sh"));
        assert!(outcome.failure_reason().starts_with("spawn failed"));
    }
}
