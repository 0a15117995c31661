use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::FetchOptions;
use crate::scheduler::{FetchBackend, SchedulerOptions, MAX_WINDOW};
use crate::transport::CurlOptions;

/// Global configuration loaded from `~/.config/mfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfetchConfig {
    /// Maximum concurrent transfers per fetch (clamped to 1..=10).
    pub max_concurrent: usize,
    /// How long the scheduler blocks waiting for a completion before re-polling.
    pub wait_timeout_ms: u64,
    /// Connect timeout per transfer.
    pub connect_timeout_secs: u64,
    /// Optional whole-transfer timeout (None = only the low-speed abort applies).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Redirects followed per transfer.
    pub max_redirections: u32,
    /// Report non-2xx responses as failures instead of returning their bodies.
    #[serde(default)]
    pub fail_on_http_error: bool,
    /// Optional libcurl receive buffer size in bytes (None = library default).
    #[serde(default)]
    pub buffer_size: Option<usize>,
    /// Driver: "threads" (default) or "multi".
    #[serde(default)]
    pub backend: FetchBackend,
}

impl Default for MfetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_WINDOW,
            wait_timeout_ms: 1000,
            connect_timeout_secs: 30,
            timeout_secs: None,
            max_redirections: 10,
            fail_on_http_error: false,
            buffer_size: None,
            backend: FetchBackend::default(),
        }
    }
}

impl MfetchConfig {
    pub fn to_fetch_options(&self) -> FetchOptions {
        FetchOptions {
            scheduler: SchedulerOptions {
                max_concurrent: self.max_concurrent.clamp(1, MAX_WINDOW),
                wait_timeout: Duration::from_millis(self.wait_timeout_ms.max(1)),
                backend: self.backend,
            },
            curl: CurlOptions {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                timeout: self.timeout_secs.map(Duration::from_secs),
                max_redirections: self.max_redirections,
                buffer_size: self.buffer_size,
                fail_on_http_error: self.fail_on_http_error,
                ..CurlOptions::default()
            },
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<MfetchConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: MfetchConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MfetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MfetchConfig::default();
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
