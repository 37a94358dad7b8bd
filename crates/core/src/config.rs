use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpanwatchError};
use crate::health::HealthPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub http_addr: String,
    pub query_timeout: Duration,
    pub health_policy: HealthPolicy,
    pub trace_list_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let data_root = env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(home).join(".local/share"));

        Self {
            db_path: data_root.join("spanwatch/spanwatch.duckdb"),
            http_addr: "127.0.0.1:8470".to_string(),
            query_timeout: Duration::from_secs(30),
            health_policy: HealthPolicy::Baseline,
            trace_list_limit: 100,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(file_overrides) = load_file_overrides(&config_file_path())? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        apply_overrides(&mut cfg, load_env_overrides()?, "environment")?;
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    db_path: Option<PathBuf>,
    http_addr: Option<String>,
    query_timeout: Option<String>,
    health_policy: Option<String>,
    trace_list_limit: Option<usize>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("SPANWATCH_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("spanwatch/config.toml")
}

fn load_file_overrides(path: &Path) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| SpanwatchError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| SpanwatchError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    let trace_list_limit = match env::var("SPANWATCH_TRACE_LIST_LIMIT") {
        Ok(v) => Some(v.parse::<usize>().map_err(|e| {
            SpanwatchError::Config(format!(
                "bad SPANWATCH_TRACE_LIST_LIMIT in environment: {e} (value={v})"
            ))
        })?),
        Err(_) => None,
    };

    Ok(ConfigOverrides {
        db_path: env::var("SPANWATCH_DB_PATH").ok().map(PathBuf::from),
        http_addr: env::var("SPANWATCH_HTTP_ADDR").ok(),
        query_timeout: env::var("SPANWATCH_QUERY_TIMEOUT").ok(),
        health_policy: env::var("SPANWATCH_HEALTH_POLICY").ok(),
        trace_list_limit,
    })
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.db_path {
        cfg.db_path = v;
    }
    if let Some(v) = overrides.http_addr {
        cfg.http_addr = v;
    }
    if let Some(v) = overrides.query_timeout {
        let timeout = humantime::parse_duration(&v).map_err(|e| {
            SpanwatchError::Config(format!("bad query_timeout in {source}: {e} (value={v})"))
        })?;
        if timeout.is_zero() {
            return Err(SpanwatchError::Config(format!(
                "query_timeout in {source} must be positive"
            )));
        }
        cfg.query_timeout = timeout;
    }
    if let Some(v) = overrides.health_policy {
        cfg.health_policy = HealthPolicy::from_str(&v).map_err(|e| {
            SpanwatchError::Config(format!("bad health_policy in {source}: {e}"))
        })?;
    }
    if let Some(v) = overrides.trace_list_limit {
        if v == 0 {
            return Err(SpanwatchError::Config(format!(
                "trace_list_limit in {source} must be positive"
            )));
        }
        cfg.trace_list_limit = v;
    }
    Ok(())
}
