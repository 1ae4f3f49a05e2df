use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    pipeline::DEFAULT_WORKERS, provider::weatherapi::DEFAULT_BASE_URL, sink::DEFAULT_OUTPUT_FILE,
};

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// workers = 4
/// sync_every = 1
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub workers: Option<usize>,
    /// Barrier after every `n` cities; absent means no barrier.
    pub sync_every: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub output: Option<PathBuf>,
}

/// Values given on the command line or through the environment.
/// Anything set here wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub workers: Option<usize>,
    pub sync_every: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub output: Option<PathBuf>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub workers: usize,
    pub sync_every: Option<usize>,
    pub timeout: Option<Duration>,
    pub output: PathBuf,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "citycast", "citycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Merge `overrides` over this config and fill in defaults.
    pub fn resolve(&self, overrides: Overrides) -> Result<Settings> {
        let api_key = overrides
            .api_key
            .or_else(|| self.api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured.\n\
                     Hint: run `citycast configure` or set the WEATHERAPI_KEY environment variable."
                )
            })?;

        let workers = overrides.workers.or(self.workers).unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(anyhow!("Worker count must be at least 1."));
        }

        let sync_every = overrides.sync_every.or(self.sync_every);
        if sync_every == Some(0) {
            return Err(anyhow!("Synchronization interval must be at least 1 city."));
        }

        Ok(Settings {
            api_key,
            base_url: overrides
                .base_url
                .or_else(|| self.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            workers,
            sync_every,
            timeout: overrides.timeout_secs.or(self.timeout_secs).map(Duration::from_secs),
            output: overrides
                .output
                .or_else(|| self.output.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE)),
        })
    }
}
