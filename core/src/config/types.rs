use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::quality::QualityGate;
use crate::util::time::secs_to_duration;

/// On-disk shape of the config file. Task entries are still loosely typed
/// here; `validate` turns this into a [`RunConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(flatten)]
    pub settings: RunSettings,

    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

/// Process-wide settings shared by every task in the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSettings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Exported to every child as `TZ` when set.
    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default)]
    pub sleep_seconds_between: f64,

    /// Unset means no timeout unless the task declares one.
    #[serde(default)]
    pub default_timeout_seconds: Option<f64>,

    #[serde(default)]
    pub default_retries: u32,

    #[serde(default)]
    pub default_retry_delay_seconds: f64,

    #[serde(default)]
    pub stop_on_error: bool,

    /// Extra environment for every task; task-level `env` wins on conflict.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub quality_gate: QualityGateConfig,

    #[serde(default)]
    pub allow_shared_outputs: Vec<SharedOutput>,

    /// Holds `output-cache.json` and `quality-summary.json`.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

/// The only config schema version this build knows.
pub const CONFIG_VERSION: u32 = 1;

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_state_dir() -> String {
    ".taskmill".to_string()
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            timezone: None,
            sleep_seconds_between: 0.0,
            default_timeout_seconds: None,
            default_retries: 0,
            default_retry_delay_seconds: 0.0,
            stop_on_error: false,
            env: BTreeMap::new(),
            log: LogConfig::default(),
            quality_gate: QualityGateConfig::default(),
            allow_shared_outputs: Vec::new(),
            state_dir: default_state_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// Directory for the run log. Blank disables the log file.
    #[serde(default = "default_log_dir")]
    pub dir: String,

    /// `{timestamp}` is replaced with a filesystem-safe local timestamp.
    #[serde(default = "default_filename_pattern")]
    pub filename_pattern: String,

    /// EnvFilter string, e.g. "info" or "taskmill_core=debug".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Route child stdout/stderr through the logger instead of forwarding raw.
    #[serde(default = "default_capture")]
    pub capture_stdout_stderr: bool,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_filename_pattern() -> String {
    "run-{timestamp}.log".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_capture() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            filename_pattern: default_filename_pattern(),
            level: default_log_level(),
            capture_stdout_stderr: default_capture(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityGateConfig {
    #[serde(default = "default_gate_enabled")]
    pub enabled: bool,

    #[serde(default = "default_title_warn")]
    pub title_missing_warn_threshold: f64,

    #[serde(default = "default_title_fail")]
    pub title_missing_fail_threshold: f64,

    #[serde(default = "default_date_warn")]
    pub date_missing_warn_threshold: f64,

    #[serde(default = "default_date_fail")]
    pub date_missing_fail_threshold: f64,

    /// Regex selecting which outputs are event-data artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_path_pattern: Option<String>,
}

fn default_gate_enabled() -> bool {
    true
}

fn default_title_warn() -> f64 {
    0.01
}

fn default_title_fail() -> f64 {
    0.05
}

fn default_date_warn() -> f64 {
    0.05
}

fn default_date_fail() -> f64 {
    0.20
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            enabled: default_gate_enabled(),
            title_missing_warn_threshold: default_title_warn(),
            title_missing_fail_threshold: default_title_fail(),
            date_missing_warn_threshold: default_date_warn(),
            date_missing_fail_threshold: default_date_fail(),
            event_path_pattern: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedOutput {
    pub output: String,
    #[serde(default)]
    pub task_ids: Vec<String>,
}

/// Coarse grouping used only for log brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Scrape,
    Tagging,
    Generate,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Scrape => "scrape",
            Phase::Tagging => "tagging",
            Phase::Generate => "generate",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task as written in the config file, before required fields are checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub retry_delay_seconds: Option<f64>,
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default)]
    pub sleep_seconds_after: Option<f64>,
    #[serde(default)]
    pub skip_if_outputs_unchanged: bool,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub on_success: Option<String>,
    #[serde(default)]
    pub on_failure: Option<String>,
    #[serde(default, rename = "type")]
    pub phase: Option<Phase>,
}

fn default_enabled() -> bool {
    true
}

/// A validated, immutable task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinition {
    pub id: String,
    pub script: String,
    pub name: Option<String>,
    pub enabled: bool,
    pub outputs: Vec<String>,
    pub depends_on: Vec<String>,
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub timeout_seconds: Option<f64>,
    pub retries: Option<u32>,
    pub retry_delay_seconds: Option<f64>,
    pub continue_on_error: bool,
    pub sleep_seconds_after: Option<f64>,
    pub skip_if_outputs_unchanged: bool,
    pub env: BTreeMap<String, String>,
    pub on_success: Option<String>,
    pub on_failure: Option<String>,
    pub phase: Option<Phase>,
}

impl TaskDefinition {
    pub fn new(id: impl Into<String>, script: impl Into<String>, outputs: Vec<String>) -> Self {
        Self {
            id: id.into(),
            script: script.into(),
            name: None,
            enabled: true,
            outputs,
            depends_on: Vec::new(),
            args: Vec::new(),
            cwd: None,
            timeout_seconds: None,
            retries: None,
            retry_delay_seconds: None,
            continue_on_error: false,
            sleep_seconds_after: None,
            skip_if_outputs_unchanged: false,
            env: BTreeMap::new(),
            on_success: None,
            on_failure: None,
            phase: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.id)
    }

    /// Task timeout, falling back to the global default. `None` disables it.
    pub fn timeout(&self, settings: &RunSettings) -> Option<Duration> {
        self.timeout_seconds
            .or(settings.default_timeout_seconds)
            .filter(|s| *s > 0.0)
            .map(secs_to_duration)
    }

    pub fn retries(&self, settings: &RunSettings) -> u32 {
        self.retries.unwrap_or(settings.default_retries)
    }

    pub fn retry_delay(&self, settings: &RunSettings) -> Duration {
        secs_to_duration(
            self.retry_delay_seconds
                .unwrap_or(settings.default_retry_delay_seconds),
        )
    }

    pub fn sleep_after(&self, settings: &RunSettings) -> Duration {
        secs_to_duration(
            self.sleep_seconds_after
                .unwrap_or(settings.sleep_seconds_between),
        )
    }
}

/// Validated, read-only configuration for one invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The file this config was loaded from.
    pub source: PathBuf,
    pub settings: RunSettings,
    pub tasks: Vec<TaskDefinition>,
    pub quality_gate: QualityGate,
}

impl RunConfig {
    pub fn state_dir(&self) -> PathBuf {
        PathBuf::from(crate::util::expand_path(&self.settings.state_dir))
    }

    pub fn output_cache_path(&self) -> PathBuf {
        self.state_dir().join("output-cache.json")
    }

    pub fn quality_summary_path(&self) -> PathBuf {
        self.state_dir().join("quality-summary.json")
    }

    /// `Some(version)` when the file declares a schema other than [`CONFIG_VERSION`].
    pub fn unsupported_version(&self) -> Option<u32> {
        (self.settings.version != CONFIG_VERSION).then_some(self.settings.version)
    }

    pub fn task(&self, id: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn enabled_tasks(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.iter().filter(|t| t.enabled)
    }
}
