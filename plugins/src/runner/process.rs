use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

use taskmill_core::runner::{RunnerPlugin, RunnerSession, RunnerStartArgs, Signal};

/// Spawns each task as a local OS process. Stdin is inherited from the
/// parent; stdout and stderr are piped for capture.
pub struct ProcessRunnerPlugin {}

impl ProcessRunnerPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ProcessRunnerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunnerPlugin for ProcessRunnerPlugin {
    fn name(&self) -> &str {
        "process"
    }

    async fn start_session(&self, args: &RunnerStartArgs) -> Result<Box<dyn RunnerSession>> {
        let mut cmd = Command::new(&args.cmd);
        cmd.args(&args.args)
            .envs(&args.envs)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &args.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("cannot start {}", args.cmd))?;
        tracing::debug!(pid = child.id(), cmd = %args.cmd, "child spawned");

        Ok(Box::new(ProcessRunnerSession { child }))
    }
}

struct ProcessRunnerSession {
    child: Child,
}

#[async_trait]
impl RunnerSession for ProcessRunnerSession {
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn signal(&mut self, signal: Signal) -> Result<()> {
        tracing::debug!(pid = self.child.id(), ?signal, "terminating child");
        let sent = match signal {
            Signal::Kill => self.child.start_kill(),
        };
        match sent {
            Ok(()) => Ok(()),
            // already exited
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e).context("kill failed"),
        }
    }

    /// `None` when the child was ended by a signal.
    async fn wait(&mut self) -> Result<Option<i32>> {
        let status = self.child.wait().await.context("wait on child failed")?;
        Ok(status.code())
    }
}
