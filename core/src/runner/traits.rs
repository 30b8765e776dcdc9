use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::types::{RunnerStartArgs, Signal};

/// One running child process.
#[async_trait]
pub trait RunnerSession: Send {
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    async fn signal(&mut self, signal: Signal) -> anyhow::Result<()>;
    /// Resolves with the exit code, or `None` when the process died from a signal.
    async fn wait(&mut self) -> anyhow::Result<Option<i32>>;
}

#[async_trait]
pub trait RunnerPlugin: Send + Sync {
    fn name(&self) -> &str;
    async fn start_session(&self, args: &RunnerStartArgs)
        -> anyhow::Result<Box<dyn RunnerSession>>;
}
