//! Explorer configuration.
//!
//! One YAML file covers the whole service; every field has a default so a
//! minimal config only needs `api_url`. Durations are written in the
//! human-readable form the rest of the workspace uses (`15ms`, `20s`).

use anyhow::Context;
use ap_resilience::RetryConfig;
use ap_utils::serde::{deserialize_duration, deserialize_url, serialize_duration, serialize_url};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Base URL of the ledger-query API, version segment included.
    #[serde(deserialize_with = "deserialize_url", serialize_with = "serialize_url")]
    pub api_url: Url,
    /// Directory of contract metadata records, one subdirectory per contract
    /// type.
    pub meta_dir: PathBuf,
    /// Gap between consecutive fan-out task start times.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub stagger_interval: Duration,
    /// Total tries per instance fetch before it settles as failed.
    pub fetch_attempts: usize,
    /// Fixed wait between fetch tries.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub fetch_backoff: Duration,
    /// Per-request timeout on ledger calls.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub request_timeout: Duration,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse("http://localhost:3000/eth/v1.2").expect("default api url is well-formed"),
            meta_dir: PathBuf::from("app/meta"),
            stagger_interval: Duration::from_millis(15),
            fetch_attempts: 10,
            fetch_backoff: Duration::from_millis(100),
            request_timeout: Duration::from_secs(20),
        }
    }
}

impl ExplorerConfig {
    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading config from {}", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| format!("parsing config from {}", path.display()))
    }

    /// Retry policy for per-instance fetch tasks.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig { max_attempts: self.fetch_attempts, backoff: self.fetch_backoff, ..Default::default() }
    }
}
