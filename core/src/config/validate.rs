use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::quality::QualityGate;
use crate::util::time::MAX_SECS;

use super::types::{ConfigFile, RunConfig, RunSettings, TaskDefinition, TaskEntry};

/// Checks structure, uniqueness and output ownership, producing a read-only [`RunConfig`].
pub fn validate(file: ConfigFile, source: PathBuf) -> Result<RunConfig, ConfigError> {
    let ConfigFile { settings, tasks } = file;

    if tasks.is_empty() {
        return Err(ConfigError::NoTasks);
    }

    check_settings(&settings)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut defs = Vec::with_capacity(tasks.len());
    for (index, entry) in tasks.into_iter().enumerate() {
        let def = to_definition(index, entry)?;
        if !seen.insert(def.id.clone()) {
            return Err(ConfigError::DuplicateTaskId(def.id));
        }
        defs.push(def);
    }

    check_output_ownership(&defs, &settings)?;

    let quality_gate = QualityGate::from_config(&settings.quality_gate)?;

    Ok(RunConfig {
        source,
        settings,
        tasks: defs,
        quality_gate,
    })
}

fn to_definition(index: usize, entry: TaskEntry) -> Result<TaskDefinition, ConfigError> {
    let id = required(entry.id, index, "id")?;
    let script = required(entry.script, index, "script")?;

    let outputs: Vec<String> = entry
        .outputs
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if outputs.is_empty() {
        return Err(ConfigError::NoOutputs(id));
    }

    check_seconds(&format!("tasks[{id}].timeoutSeconds"), entry.timeout_seconds)?;
    check_seconds(
        &format!("tasks[{id}].retryDelaySeconds"),
        entry.retry_delay_seconds,
    )?;
    check_seconds(
        &format!("tasks[{id}].sleepSecondsAfter"),
        entry.sleep_seconds_after,
    )?;

    Ok(TaskDefinition {
        id,
        script,
        name: entry.name,
        enabled: entry.enabled,
        outputs,
        depends_on: entry
            .depends_on
            .into_iter()
            .map(|d| d.trim().to_string())
            .collect(),
        args: entry.args,
        cwd: entry.cwd,
        timeout_seconds: entry.timeout_seconds,
        retries: entry.retries,
        retry_delay_seconds: entry.retry_delay_seconds,
        continue_on_error: entry.continue_on_error,
        sleep_seconds_after: entry.sleep_seconds_after,
        skip_if_outputs_unchanged: entry.skip_if_outputs_unchanged,
        env: entry.env,
        on_success: entry.on_success,
        on_failure: entry.on_failure,
        phase: entry.phase,
    })
}

fn required(
    value: Option<String>,
    index: usize,
    field: &'static str,
) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingField { index, field })
}

fn check_settings(settings: &RunSettings) -> Result<(), ConfigError> {
    check_seconds("sleepSecondsBetween", Some(settings.sleep_seconds_between))?;
    check_seconds("defaultTimeoutSeconds", settings.default_timeout_seconds)?;
    check_seconds(
        "defaultRetryDelaySeconds",
        Some(settings.default_retry_delay_seconds),
    )?;
    Ok(())
}

fn check_seconds(field: &str, value: Option<f64>) -> Result<(), ConfigError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ConfigError::InvalidNumber {
            field: field.to_string(),
            value: v.to_string(),
        }),
        Some(v) if v > MAX_SECS => Err(ConfigError::TooLarge {
            field: field.to_string(),
            value: v,
            max: MAX_SECS,
        }),
        _ => Ok(()),
    }
}

/// Each output path has exactly one owner unless `allowSharedOutputs` names
/// exactly the set of tasks claiming it.
fn check_output_ownership(
    defs: &[TaskDefinition],
    settings: &RunSettings,
) -> Result<(), ConfigError> {
    let mut owners: HashMap<String, Vec<&str>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for def in defs {
        for output in &def.outputs {
            let key = normalize_output(output);
            let entry = owners.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            if !entry.contains(&def.id.as_str()) {
                entry.push(&def.id);
            }
        }
    }

    // Several entries may name the same path; any exact match allows it.
    let mut allowed: HashMap<String, Vec<BTreeSet<&str>>> = HashMap::new();
    for s in &settings.allow_shared_outputs {
        allowed
            .entry(normalize_output(&s.output))
            .or_default()
            .push(s.task_ids.iter().map(|id| id.trim()).collect());
    }

    for output in order {
        let claimed = &owners[&output];
        if claimed.len() < 2 {
            continue;
        }
        let claimed_set: BTreeSet<&str> = claimed.iter().copied().collect();
        match allowed.get(&output) {
            Some(permitted) if permitted.iter().any(|p| *p == claimed_set) => {}
            _ => {
                return Err(ConfigError::OutputConflict {
                    output,
                    task_ids: claimed.join(", "),
                })
            }
        }
    }
    Ok(())
}

pub(crate) fn normalize_output(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let mut s = unified.as_str();
    while let Some(rest) = s.strip_prefix("./") {
        s = rest;
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::SharedOutput;

    fn entry(id: &str, outputs: &[&str]) -> TaskEntry {
        TaskEntry {
            id: Some(id.to_string()),
            script: Some(format!("scripts/{id}.sh")),
            enabled: true,
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            ..TaskEntry::default()
        }
    }

    fn file(tasks: Vec<TaskEntry>) -> ConfigFile {
        ConfigFile {
            settings: RunSettings::default(),
            tasks,
        }
    }

    #[test]
    fn rejects_empty_task_list() {
        let err = validate(file(vec![]), PathBuf::from("t.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NoTasks));
    }

    #[test]
    fn rejects_missing_script() {
        let mut e = entry("a", &["data/a.json"]);
        e.script = None;
        let err = validate(file(vec![e]), PathBuf::from("t.toml")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                index: 0,
                field: "script"
            }
        ));
    }

    #[test]
    fn rejects_blank_id() {
        let mut e = entry("a", &["data/a.json"]);
        e.id = Some("  ".into());
        let err = validate(file(vec![e]), PathBuf::from("t.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "id", .. }));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = validate(
            file(vec![entry("a", &["x.json"]), entry("a", &["y.json"])]),
            PathBuf::from("t.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTaskId(id) if id == "a"));
    }

    #[test]
    fn rejects_task_without_outputs() {
        let err = validate(file(vec![entry("a", &[" "])]), PathBuf::from("t.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NoOutputs(id) if id == "a"));
    }

    #[test]
    fn shared_output_without_allowance_is_a_conflict() {
        let err = validate(
            file(vec![
                entry("a", &["data/events.json"]),
                entry("b", &["./data/events.json"]),
            ]),
            PathBuf::from("t.toml"),
        )
        .unwrap_err();
        match err {
            ConfigError::OutputConflict { output, task_ids } => {
                assert_eq!(output, "data/events.json");
                assert_eq!(task_ids, "a, b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn shared_output_allowance_must_name_exactly_the_owners() {
        let mut cfg = file(vec![
            entry("a", &["data/events.json"]),
            entry("b", &["data/events.json"]),
            entry("c", &["data/events.json"]),
        ]);
        cfg.settings.allow_shared_outputs = vec![SharedOutput {
            output: "data/events.json".into(),
            task_ids: vec!["a".into(), "b".into()],
        }];
        assert!(validate(cfg.clone(), PathBuf::from("t.toml")).is_err());

        cfg.settings.allow_shared_outputs[0].task_ids.push("c".into());
        let run = validate(cfg, PathBuf::from("t.toml")).unwrap();
        assert_eq!(run.tasks.len(), 3);
    }

    #[test]
    fn duplicate_allowances_for_one_path_are_merged() {
        let mut cfg = file(vec![
            entry("a", &["data/all.json"]),
            entry("b", &["data/all.json"]),
        ]);
        cfg.settings.allow_shared_outputs = vec![
            SharedOutput {
                output: "data/all.json".into(),
                task_ids: vec!["a".into(), "b".into()],
            },
            SharedOutput {
                output: "./data/all.json".into(),
                task_ids: vec!["a".into()],
            },
        ];
        let run = validate(cfg, PathBuf::from("t.toml")).unwrap();
        assert_eq!(run.tasks.len(), 2);
    }

    #[test]
    fn rejects_negative_delays() {
        let mut e = entry("a", &["a.json"]);
        e.retry_delay_seconds = Some(-1.0);
        let err = validate(file(vec![e]), PathBuf::from("t.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }

    #[test]
    fn rejects_delays_beyond_one_day() {
        let mut e = entry("a", &["a.json"]);
        e.timeout_seconds = Some(2.0 * 86_400.0);
        let err = validate(file(vec![e]), PathBuf::from("t.toml")).unwrap_err();
        match err {
            ConfigError::TooLarge { field, value, .. } => {
                assert_eq!(field, "tasks[a].timeoutSeconds");
                assert_eq!(value, 172_800.0);
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut cfg = file(vec![entry("a", &["a.json"])]);
        cfg.settings.default_timeout_seconds = Some(86_400.0);
        assert!(validate(cfg, PathBuf::from("t.toml")).is_ok());
    }

    #[test]
    fn newer_version_is_accepted_and_flagged() {
        let mut cfg = file(vec![entry("a", &["a.json"])]);
        cfg.settings.version = 2;
        let run = validate(cfg, PathBuf::from("t.toml")).unwrap();
        assert_eq!(run.unsupported_version(), Some(2));
    }

    #[test]
    fn normalizes_output_paths() {
        assert_eq!(normalize_output(" ./././a/b.json "), "a/b.json");
        assert_eq!(normalize_output("a\\b.json"), "a/b.json");
    }
}
