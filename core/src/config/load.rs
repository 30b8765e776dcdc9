use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::{ConfigFile, RunConfig};
use super::validate::validate;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TASKMILL_CONFIG";

const DEFAULT_CANDIDATES: &[&str] = &[
    "taskmill.toml",
    "taskmill.json",
    "config/taskmill.toml",
    "config/taskmill.json",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Ordered candidate list: explicit flag, then `TASKMILL_CONFIG`, then the fixed defaults.
pub fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(p) = explicit {
        out.push(p.to_path_buf());
    }
    if let Ok(v) = std::env::var(CONFIG_ENV) {
        if !v.trim().is_empty() {
            out.push(PathBuf::from(v.trim()));
        }
    }
    out.extend(DEFAULT_CANDIDATES.iter().map(PathBuf::from));
    out
}

pub fn locate(candidates: &[PathBuf]) -> Result<PathBuf, ConfigError> {
    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or_else(|| ConfigError::NotFound {
            tried: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

pub fn load_config(explicit: Option<&Path>) -> Result<RunConfig, ConfigError> {
    let path = locate(&candidate_paths(explicit))?;
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<RunConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text, ConfigFormat::from_path(path), path)
}

/// Parses and validates config text. The root must be a table/object.
pub fn parse_config(
    text: &str,
    format: ConfigFormat,
    source: &Path,
) -> Result<RunConfig, ConfigError> {
    let parse_err = |message: String| ConfigError::Parse {
        path: source.to_path_buf(),
        message,
    };

    let value: serde_json::Value = match format {
        ConfigFormat::Json => serde_json::from_str(text).map_err(|e| parse_err(e.to_string()))?,
        ConfigFormat::Toml => {
            let table: toml::Value = toml::from_str(text).map_err(|e| parse_err(e.to_string()))?;
            serde_json::to_value(table).map_err(|e| parse_err(e.to_string()))?
        }
    };

    if !value.is_object() {
        return Err(ConfigError::NotAnObject);
    }

    let file: ConfigFile = serde_json::from_value(value).map_err(|e| parse_err(e.to_string()))?;
    validate(file, source.to_path_buf())
}
