// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration: defaults, an optional TOML file, then env var overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value}")]
    InvalidEnvVar { var: &'static str, value: String },
}

/// On-disk representation of `<runtime-dir>/config.toml`. Every section and
/// field is optional; absent values fall back to defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    background: BackgroundSection,
    #[serde(default)]
    agent: AgentSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BackgroundSection {
    mode: Option<String>,
    max_parallel: Option<u32>,
    worker_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AgentSection {
    longagent: Option<LongagentSection>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LongagentSection {
    parallel: Option<ParallelSection>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ParallelSection {
    max_concurrency: Option<u32>,
    task_max_retries: Option<u32>,
    poll_interval_ms: Option<u64>,
}

/// Fully resolved runtime configuration, threaded explicitly rather than
/// read from a process-wide global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub background_mode: String,
    pub background_max_parallel: u32,
    pub background_worker_timeout_ms: u64,
    pub stage_max_concurrency: u32,
    pub stage_task_max_retries: u32,
    pub stage_poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            background_mode: "worker_process".to_string(),
            background_max_parallel: 2,
            background_worker_timeout_ms: 900_000,
            stage_max_concurrency: 3,
            stage_task_max_retries: 2,
            stage_poll_interval_ms: 50,
        }
    }
}

impl Config {
    /// Resolve configuration: defaults, overridden by `<runtime_dir>/config.toml`
    /// if present, overridden by env vars.
    pub fn load(runtime_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let path = runtime_dir.join("config.toml");
        if let Some(file) = read_config_file(&path)? {
            config.apply_file(file);
        }
        config.apply_env()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(mode) = file.background.mode {
            self.background_mode = mode;
        }
        if let Some(max_parallel) = file.background.max_parallel {
            self.background_max_parallel = max_parallel;
        }
        if let Some(timeout) = file.background.worker_timeout_ms {
            self.background_worker_timeout_ms = timeout;
        }
        if let Some(parallel) = file.agent.longagent.and_then(|l| l.parallel) {
            if let Some(v) = parallel.max_concurrency {
                self.stage_max_concurrency = v;
            }
            if let Some(v) = parallel.task_max_retries {
                self.stage_task_max_retries = v;
            }
            if let Some(v) = parallel.poll_interval_ms {
                self.stage_poll_interval_ms = v;
            }
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = parse_env_u32("BGTASK_MAX_PARALLEL")? {
            self.background_max_parallel = v;
        }
        if let Some(v) = parse_env_u64("BGTASK_WORKER_TIMEOUT_MS")? {
            self.background_worker_timeout_ms = v;
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let file: ConfigFile =
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(Some(file))
        }
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_env_u32(var: &'static str) -> Result<Option<u32>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvVar { var, value }),
        Err(_) => Ok(None),
    }
}

fn parse_env_u64(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvVar { var, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
