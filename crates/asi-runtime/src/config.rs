//! Control loop configuration
//!
//! Loaded from TOML at startup, falls back to defaults if no config file
//! exists or it fails to parse.

use asi_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AsiConfig {
    /// Tick cadence and per-operation bounds.
    pub scheduler: SchedulerConfig,
    /// Self-tuning of the advisory interval hint.
    pub tuning: TuningConfig,
    /// Built-in heartbeat part.
    pub heartbeat: HeartbeatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Host tick cadence in milliseconds (one display frame by default).
    pub tick_ms: u64,
    /// Upper bound on a single part poll. 0 disables the bound.
    pub poll_timeout_ms: u64,
    /// Upper bound on a single action exec. 0 disables the bound.
    pub task_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Starting value of the interval hint.
    pub initial_interval_ms: u64,
    /// Tick spacing above which the hint is lowered.
    pub slow_tick_threshold_ms: u64,
    /// Amount the hint drops per slow tick.
    pub step_ms: u64,
    /// The hint never drops below this.
    pub floor_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub enabled: bool,
    /// Knowledge node the heartbeat writes to.
    pub node: String,
}

// ============================================================
// Defaults
// ============================================================

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { tick_ms: 16, poll_timeout_ms: 5_000, task_timeout_ms: 5_000 }
    }
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self { initial_interval_ms: 100, slow_tick_threshold_ms: 500, step_ms: 10, floor_ms: 50 }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { enabled: true, node: "heartbeat".into() }
    }
}

// ============================================================
// Loading
// ============================================================

impl AsiConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {} — using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to load {}: {} — using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Read and parse a TOML file without falling back.
    pub fn try_load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Render the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl SchedulerConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        bound(self.poll_timeout_ms)
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        bound(self.task_timeout_ms)
    }
}

fn bound(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = AsiConfig::default();
        assert_eq!(config.scheduler.tick_ms, 16);
        assert_eq!(config.tuning.initial_interval_ms, 100);
        assert_eq!(config.tuning.slow_tick_threshold_ms, 500);
        assert_eq!(config.tuning.floor_ms, 50);
        assert_eq!(config.heartbeat.node, "heartbeat");
    }

    #[test]
    fn zero_timeout_disables_bound() {
        let config = SchedulerConfig { tick_ms: 0, poll_timeout_ms: 0, task_timeout_ms: 250 };
        assert!(config.poll_timeout().is_none());
        assert_eq!(config.task_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.tick_period(), Duration::from_millis(1));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tuning]\nfloor_ms = 20\n\n[heartbeat]\nenabled = false").unwrap();
        let config = AsiConfig::load(file.path());
        assert_eq!(config.tuning.floor_ms, 20);
        assert_eq!(config.tuning.step_ms, 10);
        assert!(!config.heartbeat.enabled);
        assert_eq!(config.scheduler.poll_timeout_ms, 5_000);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scheduler\ntick_ms = ").unwrap();
        let config = AsiConfig::load(file.path());
        assert_eq!(config.scheduler.tick_ms, 16);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = AsiConfig::from_toml_str("[tuning]\nstep_ms = \"ten\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().starts_with("config error:"));
    }

    #[test]
    fn try_load_reports_missing_file_as_io() {
        let err = AsiConfig::try_load(Path::new("/nonexistent/asi.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AsiConfig::load(Path::new("/nonexistent/asi.toml"));
        assert_eq!(config.tuning.step_ms, 10);
    }

    #[test]
    fn toml_dump_reloads() {
        let dumped = AsiConfig::default().to_toml();
        let parsed: AsiConfig = toml::from_str(&dumped).unwrap();
        assert_eq!(parsed.scheduler.task_timeout_ms, 5_000);
        assert!(dumped.contains("[tuning]"));
    }
}
