// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process configuration and state directory layout
//!
//! Configuration is resolved once at process start ([`RelayConfig::load`]) and
//! passed down explicitly; nothing here is cached globally.

use crate::entry::ChannelId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Marker directory holding all shared state
pub const STATE_DIR_NAME: &str = ".trl";

/// Environment variable overriding state directory discovery
pub const STATE_DIR_ENV: &str = "TRL_STATE_DIR";

/// Errors from configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Locations of every shared file, all under one state directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    root: PathBuf,
}

impl StatePaths {
    /// Use `root` as the state directory, creating it if needed
    pub fn at(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Walk upward from `start` to the first `.trl` directory
    ///
    /// Creates `.trl` in `start` when no ancestor has one.
    pub fn discover(start: &Path) -> Result<Self, ConfigError> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(STATE_DIR_NAME);
            if candidate.is_dir() {
                return Ok(Self { root: candidate });
            }
            if !current.pop() {
                return Self::at(start.join(STATE_DIR_NAME));
            }
        }
    }

    /// Resolve from `TRL_STATE_DIR`, else discover from the working directory
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
            return Self::at(dir);
        }
        let cwd = std::env::current_dir()?;
        Self::discover(&cwd)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn wal(&self) -> PathBuf {
        self.root.join("wal.jsonl")
    }

    pub fn wal_lock(&self) -> PathBuf {
        self.root.join("wal.lock")
    }

    pub fn counter(&self) -> PathBuf {
        self.root.join("seq.counter")
    }

    pub fn counter_lock(&self) -> PathBuf {
        self.root.join("seq.lock")
    }

    pub fn run_lock(&self) -> PathBuf {
        self.root.join("worker.lock")
    }

    pub fn watermarks(&self) -> PathBuf {
        self.root.join("watermarks.json")
    }

    pub fn handoff(&self) -> PathBuf {
        self.root.join("handoff.json")
    }

    pub fn channels(&self) -> PathBuf {
        self.root.join("channels.json")
    }

    pub fn verified(&self) -> PathBuf {
        self.root.join("verified.json")
    }

    pub fn config(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn log(&self) -> PathBuf {
        self.root.join("trl.log")
    }
}

/// Which remote sink the worker delivers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// GitHub issue comments via the `gh` CLI
    #[default]
    Github,
    /// Capture only; the worker exits without delivering
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    /// `owner/name`; when unset the sink uses the repository of the working directory
    pub repo: Option<String>,
    /// Marker used to find or create the fallback channel
    pub fallback_marker: String,
    /// How many recent remote entries to inspect for dedup and verification
    pub list_limit: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Github,
            repo: None,
            fallback_marker: "trl:session-log".to_string(),
            list_limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Delay before each retry; attempts = 1 + backoff.len()
    #[serde(with = "duration_list")]
    pub backoff: Vec<Duration>,
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Duration,
    /// Pause between successful deliveries
    #[serde(with = "humantime_serde")]
    pub pace: Duration,
    /// Launch a detached worker after each capture
    pub autostart: bool,
    /// Posted entries older than this are compacted
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
}

impl WorkerConfig {
    pub fn max_attempts(&self) -> usize {
        self.backoff.len() + 1
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            backoff: [1, 2, 4, 8, 16].map(Duration::from_secs).to_vec(),
            attempt_timeout: Duration::from_secs(30),
            pace: Duration::from_secs(1),
            autostart: true,
            retention: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocksConfig {
    pub attempts: u32,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for LocksConfig {
    fn default() -> Self {
        Self {
            attempts: 20,
            interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Grace period for an in-flight worker before checking
    #[serde(with = "humantime_serde")]
    pub wait: Duration,
    /// Minimum key-term overlap for a fuzzy match and for truncation checks
    pub similarity_threshold: f64,
    pub signature_len: usize,
    /// Shortest common signature prefix accepted as a match
    pub min_signature_len: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(3),
            similarity_threshold: 0.7,
            signature_len: 120,
            min_signature_len: 24,
        }
    }
}

/// Complete configuration for one process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Channel new captures are addressed to (0 = use fallback)
    pub channel: ChannelId,
    pub sink: SinkConfig,
    pub worker: WorkerConfig,
    pub locks: LocksConfig,
    pub verify: VerifyConfig,
}

impl RelayConfig {
    /// Load `config.toml` from the state directory and apply environment overrides
    pub fn load(paths: &StatePaths) -> Result<Self, ConfigError> {
        let path = paths.config();
        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e.into()),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `TRL_*` overrides using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TRL_CHANNEL") {
            let channel = value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                var: "TRL_CHANNEL",
                value: value.clone(),
            })?;
            self.channel = ChannelId(channel);
        }
        if let Some(value) = lookup("TRL_SINK") {
            self.sink.kind = match value.trim() {
                "github" => SinkKind::Github,
                "disabled" | "none" => SinkKind::Disabled,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "TRL_SINK",
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup("TRL_REPO") {
            self.sink.repo = Some(value).filter(|r| !r.trim().is_empty());
        }
        if let Some(value) = lookup("TRL_WORKER_AUTOSTART") {
            self.worker.autostart = match value.trim() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "TRL_WORKER_AUTOSTART",
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup("TRL_VERIFY_WAIT_MS") {
            let ms = value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                var: "TRL_VERIFY_WAIT_MS",
                value: value.clone(),
            })?;
            self.verify.wait = Duration::from_millis(ms);
        }
        Ok(())
    }
}

/// Serde support for a list of human-readable durations (`["1s", "2s"]`)
mod duration_list {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(list: &[Duration], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(list.iter().map(|d| humantime::format_duration(*d).to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Duration>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| humantime::parse_duration(s).map_err(D::Error::custom))
            .collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
