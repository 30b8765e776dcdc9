use std::path::Path;

use regex::Regex;
use serde_json::Value;

use crate::config::{normalize_output, QualityGateConfig};
use crate::error::ConfigError;
use crate::util::expand_path;

use super::{GateStatus, QualityGateResult, Thresholds};

/// Keys accepted as a record's date, in lookup order.
pub const DATE_FIELDS: [&str; 6] = ["date", "startDate", "start", "startsAt", "dateTime", "datetime"];

/// `*events.json` anywhere, or any `.json` directly under an `events/` directory.
const DEFAULT_EVENT_PATH_PATTERN: &str = r"(?i)(?:^|/)(?:[^/]*events\.json|events/[^/]+\.json)$";

#[derive(Debug, Clone)]
pub struct QualityGate {
    config: QualityGateConfig,
    matcher: Regex,
}

impl QualityGate {
    pub fn from_config(config: &QualityGateConfig) -> Result<Self, ConfigError> {
        check_thresholds(
            "titleMissing",
            config.title_missing_warn_threshold,
            config.title_missing_fail_threshold,
        )?;
        check_thresholds(
            "dateMissing",
            config.date_missing_warn_threshold,
            config.date_missing_fail_threshold,
        )?;
        let pattern = config
            .event_path_pattern
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_EVENT_PATH_PATTERN);
        let matcher =
            Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            config: config.clone(),
            matcher,
        })
    }

    pub fn config(&self) -> &QualityGateConfig {
        &self.config
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn title_thresholds(&self) -> Thresholds {
        Thresholds {
            warn: self.config.title_missing_warn_threshold,
            fail: self.config.title_missing_fail_threshold,
        }
    }

    pub fn date_thresholds(&self) -> Thresholds {
        Thresholds {
            warn: self.config.date_missing_warn_threshold,
            fail: self.config.date_missing_fail_threshold,
        }
    }

    pub fn is_event_file(&self, output: &str) -> bool {
        self.matcher.is_match(&normalize_output(output))
    }

    /// `None` when the gate is disabled or no output is an event-data file.
    pub fn evaluate(&self, task_id: &str, outputs: &[String]) -> Option<QualityGateResult> {
        if !self.enabled() {
            return None;
        }
        let checked: Vec<String> = outputs
            .iter()
            .filter(|o| self.is_event_file(o))
            .cloned()
            .collect();
        if checked.is_empty() {
            return None;
        }

        let mut result = QualityGateResult {
            task_id: task_id.to_string(),
            status: GateStatus::Ok,
            detail: String::new(),
            checked_outputs: checked.clone(),
            total_events: 0,
            missing_title_count: 0,
            missing_date_count: 0,
            title_missing_rate: 0.0,
            date_missing_rate: 0.0,
            title_thresholds: self.title_thresholds(),
            date_thresholds: self.date_thresholds(),
        };

        for output in &checked {
            let events = match read_events(Path::new(&expand_path(output))) {
                Ok(events) => events,
                Err(reason) => {
                    result.status = GateStatus::Fail;
                    result.detail = format!("{output}: {reason}");
                    return Some(result);
                }
            };
            result.total_events += events.len();
            for event in &events {
                if !has_title(event) {
                    result.missing_title_count += 1;
                }
                if !has_date(event) {
                    result.missing_date_count += 1;
                }
            }
        }

        if result.total_events == 0 {
            result.status = GateStatus::Warn;
            result.detail = "no events in checked outputs".to_string();
            return Some(result);
        }

        let total = result.total_events as f64;
        result.title_missing_rate = result.missing_title_count as f64 / total;
        result.date_missing_rate = result.missing_date_count as f64 / total;

        let title = classify_rate(result.title_missing_rate, result.title_thresholds);
        let date = classify_rate(result.date_missing_rate, result.date_thresholds);
        result.status = title.max(date);
        result.detail = format!(
            "{} events; missing title {}/{} ({:.1}%, {title}); missing date {}/{} ({:.1}%, {date})",
            result.total_events,
            result.missing_title_count,
            result.total_events,
            result.title_missing_rate * 100.0,
            result.missing_date_count,
            result.total_events,
            result.date_missing_rate * 100.0,
        );
        Some(result)
    }
}

/// `rate > fail` fails, `rate > warn` warns, anything else is ok.
pub fn classify_rate(rate: f64, thresholds: Thresholds) -> GateStatus {
    if rate > thresholds.fail {
        GateStatus::Fail
    } else if rate > thresholds.warn {
        GateStatus::Warn
    } else {
        GateStatus::Ok
    }
}

fn check_thresholds(field: &'static str, warn: f64, fail: f64) -> Result<(), ConfigError> {
    let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if in_range(warn) && in_range(fail) && warn <= fail {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { field, warn, fail })
    }
}

/// The record list of an artifact: a top-level array, or the `events` field of an object.
fn read_events(path: &Path) -> Result<Vec<Value>, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("unreadable ({e})"))?;
    let root: Value = serde_json::from_str(&text).map_err(|e| format!("invalid JSON ({e})"))?;
    match root {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("events") {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err("`events` is not a list".to_string()),
            None => Err("no `events` list".to_string()),
        },
        _ => Err("root is neither an object nor a list".to_string()),
    }
}

fn has_title(event: &Value) -> bool {
    event
        .get("title")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.trim().is_empty())
}

fn has_date(event: &Value) -> bool {
    DATE_FIELDS.iter().any(|k| match event.get(*k) {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    })
}
