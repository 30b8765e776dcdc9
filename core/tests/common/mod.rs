#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::AsyncRead;

use taskmill_core::config::{parse_config, ConfigFormat, RunConfig};
use taskmill_core::context::{RunContext, TASK_ID_ENV};
use taskmill_core::outputs::OutputCache;
use taskmill_core::runner::{RunnerPlugin, RunnerSession, RunnerStartArgs, Signal};

/// One scripted spawn: optional file write, then output and exit code.
#[derive(Debug, Clone, Default)]
pub struct Step {
    pub exit: i32,
    pub stdout: String,
    pub stderr: String,
    pub write: Option<(PathBuf, String)>,
    /// Never exits on its own; only a kill ends it.
    pub hang: bool,
}

impl Step {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn exit(code: i32) -> Self {
        Self {
            exit: code,
            ..Self::default()
        }
    }

    pub fn hang() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn writes(mut self, path: &Path, body: &str) -> Self {
        self.write = Some((path.to_path_buf(), body.to_string()));
        self
    }

    pub fn stderr(mut self, text: &str) -> Self {
        self.stderr = text.to_string();
        self
    }
}

#[derive(Default)]
struct Script {
    steps: HashMap<String, VecDeque<Step>>,
    spawned: Vec<String>,
    envs: Vec<RunnerStartArgs>,
}

/// Fake runner keyed by the task id in the child environment. Tasks with no
/// remaining steps exit 0 without output.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedRunner {
    pub fn on(self, task_id: &str, steps: Vec<Step>) -> Self {
        self.inner
            .lock()
            .unwrap()
            .steps
            .insert(task_id.to_string(), steps.into());
        self
    }

    pub fn spawned(&self) -> Vec<String> {
        self.inner.lock().unwrap().spawned.clone()
    }

    pub fn spawn_count(&self, task_id: &str) -> usize {
        self.spawned().iter().filter(|id| *id == task_id).count()
    }

    pub fn start_args(&self) -> Vec<RunnerStartArgs> {
        self.inner.lock().unwrap().envs.clone()
    }
}

#[async_trait]
impl RunnerPlugin for ScriptedRunner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn start_session(
        &self,
        args: &RunnerStartArgs,
    ) -> anyhow::Result<Box<dyn RunnerSession>> {
        let task_id = args.envs.get(TASK_ID_ENV).cloned().unwrap_or_default();
        let step = {
            let mut inner = self.inner.lock().unwrap();
            inner.spawned.push(task_id.clone());
            inner.envs.push(args.clone());
            inner
                .steps
                .get_mut(&task_id)
                .and_then(VecDeque::pop_front)
                .unwrap_or_default()
        };
        if let Some((path, body)) = &step.write {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, body)?;
        }
        Ok(Box::new(ScriptedSession {
            step: Some(step),
            killed: false,
        }))
    }
}

struct ScriptedSession {
    step: Option<Step>,
    killed: bool,
}

#[async_trait]
impl RunnerSession for ScriptedSession {
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        let text = self.step.as_ref()?.stdout.clone();
        Some(Box::new(std::io::Cursor::new(text.into_bytes())))
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        let text = self.step.as_ref()?.stderr.clone();
        Some(Box::new(std::io::Cursor::new(text.into_bytes())))
    }

    async fn signal(&mut self, _signal: Signal) -> anyhow::Result<()> {
        self.killed = true;
        Ok(())
    }

    async fn wait(&mut self) -> anyhow::Result<Option<i32>> {
        if self.killed {
            self.step = None;
            return Ok(None);
        }
        if self.step.as_ref().is_some_and(|s| s.hang) {
            std::future::pending::<()>().await;
        }
        Ok(self.step.take().map(|s| s.exit))
    }
}

/// TOML config whose `stateDir` points into `dir`. `body` is appended verbatim.
pub fn config(dir: &Path, body: &str) -> RunConfig {
    let text = format!(
        "stateDir = \"{}\"\nlog = {{ captureStdoutStderr = true }}\n{body}",
        dir.join("state").display()
    );
    parse_config(&text, ConfigFormat::Toml, &dir.join("taskmill.toml")).unwrap()
}

pub fn context(config: RunConfig, runner: &ScriptedRunner) -> RunContext {
    RunContext::with_cache(
        Arc::new(config),
        Arc::new(runner.clone()),
        OutputCache::default(),
    )
}

pub fn out(dir: &Path, name: &str) -> String {
    dir.join(name).display().to_string()
}
