use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MIN_INTERVAL_MS: u64 = 100;
const MIN_CPU_WINDOW_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Refresh interval; also the time budget of one frame build.
    pub interval_ms: u64,
    /// Window over which per-process CPU usage is measured.
    pub cpu_sample_window_ms: u64,
    /// Threads used for process enrichment.
    pub enrich_workers: usize,
    /// Characters of the command line shown in the process table.
    pub command_width: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            cpu_sample_window_ms: 100,
            enrich_workers: 8,
            command_width: 100,
        }
    }
}

impl MonitorConfig {
    /// Load from the user config directory; defaults when there is no file.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // An empty or unreadable file falls back to defaults
        if data.is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_slice(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid config file {:?}: {}", config_path, e);
            Self::default()
        });

        Ok(config.sanitized())
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_vec_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("rocm-top").join("config.json"))
    }

    /// Clamp values to what the refresh loop can work with.
    pub fn sanitized(mut self) -> Self {
        self.interval_ms = self.interval_ms.max(MIN_INTERVAL_MS);
        self.cpu_sample_window_ms = self.cpu_sample_window_ms.max(MIN_CPU_WINDOW_MS);
        // A sample window at or past the interval would time out every build.
        let max_window_ms = self.interval_ms / 2;
        if self.cpu_sample_window_ms > max_window_ms {
            log::warn!(
                "CPU sample window of {} ms does not fit a {} ms refresh, using {} ms",
                self.cpu_sample_window_ms,
                self.interval_ms,
                max_window_ms
            );
            self.cpu_sample_window_ms = max_window_ms;
        }
        self.enrich_workers = self.enrich_workers.max(1);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn cpu_sample_window(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_window_ms)
    }
}
