use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "TASKBOOK_DIR";
pub const LOG_LEVEL_ENV: &str = "TASKBOOK_LOG_LEVEL";
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Optional `config.json`; every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Debug, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub debug: bool,
    pub env_data_dir: Option<String>,
    pub env_log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Settings {
    /// Flag, then environment, then config file, then the working directory.
    pub fn resolve(overrides: Overrides, config: Option<ConfigFile>, cwd: &Path) -> Self {
        let config = config.unwrap_or_default();

        let data_dir = overrides
            .data_dir
            .or_else(|| non_blank(overrides.env_data_dir).map(PathBuf::from))
            .or(config.data_dir)
            .unwrap_or_else(|| cwd.to_path_buf());
        let data_dir = absolutize(cwd, data_dir);

        let log_level = if overrides.debug {
            "debug".to_string()
        } else {
            non_blank(overrides.env_log_level)
                .or_else(|| non_blank(config.log_level))
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
        };

        let log_dir = overrides
            .log_dir
            .or(config.log_dir)
            .map(|dir| absolutize(cwd, dir));

        Self {
            data_dir,
            log_dir,
            log_level,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("taskbook").join("config.json"))
}

/// Reads the config file if present. A file that fails to parse is reported
/// and ignored.
pub fn load_config(path: Option<&Path>) -> Result<Option<ConfigFile>> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str::<ConfigFile>(&content) {
        Ok(config) => Ok(Some(config)),
        Err(err) => {
            eprintln!("Warning: failed to parse {}: {}", path.display(), err);
            Ok(None)
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn absolutize(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}
