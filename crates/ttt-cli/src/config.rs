//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use ttt_core::{DEFAULT_RETENTION_DAYS, Retention};
use ttt_tracker::{DEFAULT_DEBOUNCE, DEFAULT_SWEEP_INTERVAL, TrackerOptions};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Days closed tabs and visits are kept.
    pub retention_days: u32,
    /// Debounce window for activation and navigation bursts.
    pub debounce_ms: u64,
    /// Seconds between retention passes while `run` is active.
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("ttt.db"),
            retention_days: DEFAULT_RETENTION_DAYS,
            debounce_ms: u64::try_from(DEFAULT_DEBOUNCE.as_millis()).unwrap_or(150),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // TTT_DATABASE_PATH, TTT_RETENTION_DAYS, ...
        figment = figment.merge(Env::prefixed("TTT_"));

        figment.extract()
    }

    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            debounce: Duration::from_millis(self.debounce_ms),
            retention: Retention::days(self.retention_days),
        }
    }

    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Returns the platform-specific config directory for ttt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ttt"))
}

/// Returns the platform-specific data directory for ttt.
///
/// On Linux: `~/.local/share/ttt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ttt"))
}
