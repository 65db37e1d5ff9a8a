#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

use crate::fanout::DEFAULT_MAX_WORKERS;
use crate::matcher::DEFAULT_TOLERANCE;

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_CHANNEL_URL: &str = "https://www.youtube.com/@thevibecoder69";
pub const DEFAULT_SCAN_DIR: &str = "temp";
pub const DEFAULT_CACHE_DIR: &str = ".";

const CHANNEL_URL_KEY: &str = "CLEANER_CHANNEL_URL";
const SCAN_DIR_KEY: &str = "CLEANER_SCAN_DIR";
const CACHE_DIR_KEY: &str = "CLEANER_CACHE_DIR";
const TOLERANCE_KEY: &str = "CLEANER_TOLERANCE";
const MAX_WORKERS_KEY: &str = "CLEANER_MAX_WORKERS";
const SHORTS_LIMIT_KEY: &str = "CLEANER_SHORTS_LIMIT";
const COOKIES_KEY: &str = "CLEANER_COOKIES";

#[derive(Debug, Clone, PartialEq)]
pub struct CleanerSettings {
    pub channel_url: String,
    pub scan_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub tolerance: f64,
    pub max_workers: usize,
    pub shorts_limit: Option<usize>,
    pub cookies: Option<PathBuf>,
}

/// Values given on the command line; they win over the environment and the
/// `.env` file.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub channel_url: Option<String>,
    pub scan_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub tolerance: Option<f64>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_settings(overrides: SettingsOverrides) -> Result<CleanerSettings> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    Ok(build_settings(&file_vars, env_var_string, overrides))
}

fn build_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: SettingsOverrides,
) -> CleanerSettings {
    let lookup = |key: &str| lookup_value(key, file_vars, &env_lookup);

    let channel_url = overrides
        .channel_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| lookup(CHANNEL_URL_KEY))
        .unwrap_or_else(|| DEFAULT_CHANNEL_URL.to_string());
    let scan_dir = overrides
        .scan_dir
        .or_else(|| lookup(SCAN_DIR_KEY).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCAN_DIR));
    let cache_dir = overrides
        .cache_dir
        .or_else(|| lookup(CACHE_DIR_KEY).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
    let tolerance = overrides
        .tolerance
        .or_else(|| lookup(TOLERANCE_KEY).and_then(|value| value.parse::<f64>().ok()))
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or(DEFAULT_TOLERANCE);
    let max_workers = lookup(MAX_WORKERS_KEY)
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_WORKERS);
    let shorts_limit = lookup(SHORTS_LIMIT_KEY).and_then(|value| value.parse::<usize>().ok());
    let cookies = lookup(COOKIES_KEY).map(PathBuf::from);

    CleanerSettings {
        channel_url,
        scan_dir,
        cache_dir,
        tolerance,
        max_workers,
        shorts_limit,
        cookies,
    }
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| {
        file_vars
            .get(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
