use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::segmenter::{DEFAULT_SEGMENT_COUNT, DEFAULT_SEGMENT_THRESHOLD};

/// Default User-Agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("rangefetch/", env!("CARGO_PKG_VERSION"));

/// Retry policy parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per segment, including the first. 0 is treated as 1.
    pub retry_times: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_times: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 30.0,
        }
    }
}

/// Download settings, loaded from `~/.config/rangefetch/config.toml` or built in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Files at or below this many bytes are fetched as one segment.
    pub segment_threshold_bytes: u64,
    /// Number of segments (and fetcher threads) for files above the threshold.
    pub segment_count: usize,
    /// Receive chunk size in bytes; each chunk is one positioned write and one progress tick.
    pub chunk_size: usize,
    /// User-Agent header.
    pub user_agent: String,
    /// Extra request headers (e.g. Authorization, Cookie) sent with every request.
    pub headers: BTreeMap<String, String>,
    /// TCP/TLS connect timeout per attempt, in seconds.
    pub connect_timeout_secs: u64,
    /// Hard wall-clock limit per attempt, in seconds.
    pub request_timeout_secs: u64,
    /// Replace an existing file at the final path instead of failing.
    pub overwrite: bool,
    pub retry: RetryConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            segment_threshold_bytes: DEFAULT_SEGMENT_THRESHOLD,
            segment_count: DEFAULT_SEGMENT_COUNT,
            chunk_size: 64 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: BTreeMap::new(),
            connect_timeout_secs: 30,
            request_timeout_secs: 3600,
            overwrite: false,
            retry: RetryConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.segment_threshold_bytes == 0 {
            anyhow::bail!("segment_threshold_bytes must be greater than 0");
        }
        if self.segment_count == 0 {
            anyhow::bail!("segment_count must be at least 1");
        }
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than 0");
        }
        for (name, secs) in [
            ("retry.base_delay_secs", self.retry.base_delay_secs),
            ("retry.max_delay_secs", self.retry.max_delay_secs),
        ] {
            if Duration::try_from_secs_f64(secs).is_err() {
                anyhow::bail!("{} must be a finite, non-negative number of seconds, got {}", name, secs);
            }
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rangefetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate configuration from an explicit path.
pub fn load_from_path(path: &Path) -> Result<FetchConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: FetchConfig = toml::from_str(&data)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
