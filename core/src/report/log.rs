//! Scoped logging helpers. Every engine log line goes through one of these
//! so the `scope` field is always present.
use crate::runner::LineStream;

use super::format::{level_name, render_line, LogScope};

pub fn run(msg: impl AsRef<str>) {
    tracing::info!(scope = LogScope::Run.as_str(), "{}", msg.as_ref());
}

pub fn phase(msg: impl AsRef<str>) {
    tracing::info!(scope = LogScope::Phase.as_str(), "{}", msg.as_ref());
}

pub fn task(msg: impl AsRef<str>) {
    tracing::info!(scope = LogScope::Task.as_str(), "{}", msg.as_ref());
}

pub fn warn(msg: impl AsRef<str>) {
    tracing::warn!(scope = LogScope::Warn.as_str(), "{}", msg.as_ref());
}

pub fn error(msg: impl AsRef<str>) {
    tracing::error!(scope = LogScope::Error.as_str(), "{}", msg.as_ref());
}

pub fn debug(msg: impl AsRef<str>) {
    tracing::debug!(scope = LogScope::Debug.as_str(), "{}", msg.as_ref());
}

/// One line of child output routed through the logger.
pub fn child_output(task_id: &str, stream: LineStream, line: &str) {
    match stream {
        LineStream::Stdout => task(format!("[{task_id}] {line}")),
        LineStream::Stderr => task(format!("[{task_id}:stderr] {line}")),
    }
}

/// Reports an error whether or not a subscriber has been installed yet.
pub fn fatal(msg: impl AsRef<str>) {
    if tracing::dispatcher::has_been_set() {
        error(msg);
    } else {
        let stamp = crate::util::time::log_stamp(chrono::Local::now());
        eprintln!(
            "{}",
            render_line(
                &stamp,
                level_name(&tracing::Level::ERROR),
                LogScope::Error.as_str(),
                msg.as_ref()
            )
        );
    }
}
