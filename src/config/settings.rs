//! Settings structures for cas-typer configuration

use crate::catalog::DEFAULT_MODEL_EXTENSION;
use crate::error::Error;
use crate::monitor::MonitorConfig;
use crate::search::DEFAULT_BINARY;
use crate::sequences::DEFAULT_MIN_LENGTH;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest accepted monitor interval (one day)
pub const MAX_MONITOR_INTERVAL_SECS: f64 = 86_400.0;

/// Shortest interval the monitor will sleep for
const MIN_MONITOR_INTERVAL_SECS: f64 = 0.01;

/// Main settings structure matching `cas-typer.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search: SearchSettings,
    pub typing: TypingSettings,
    pub sequences: SequenceSettings,
    pub monitor: MonitorSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables (CAS_TYPER_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("CAS_TYPER_HMM_DIR") {
            self.search.hmm_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CAS_TYPER_HMMSEARCH") {
            self.search.hmmsearch = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CAS_TYPER_THREADS") {
            if let Ok(threads) = val.parse() {
                self.search.threads = Some(threads);
            }
        }
        if let Ok(val) = std::env::var("CAS_TYPER_CAS_TYPES_FILE") {
            self.typing.cas_types_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("CAS_TYPER_MIN_LENGTH") {
            if let Ok(min_length) = val.parse() {
                self.sequences.min_length = min_length;
            }
        }
        if let Ok(val) = std::env::var("CAS_TYPER_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.search.model_extension.trim().is_empty() {
            return Err(Error::Settings("search.model_extension is empty".to_string()));
        }
        if self.search.threads == Some(0) {
            return Err(Error::Settings("search.threads must be at least 1".to_string()));
        }
        let m = &self.monitor;
        if !(0.0 < m.warning_threshold
            && m.warning_threshold < m.critical_threshold
            && m.critical_threshold <= 100.0)
        {
            return Err(Error::Settings(format!(
                "monitor thresholds must satisfy 0 < warning ({}) < critical ({}) <= 100",
                m.warning_threshold, m.critical_threshold
            )));
        }
        if !(m.interval_secs.is_finite()
            && m.interval_secs > 0.0
            && m.interval_secs <= MAX_MONITOR_INTERVAL_SECS)
        {
            return Err(Error::Settings(format!(
                "monitor.interval_secs must be in (0, {}], got {}",
                MAX_MONITOR_INTERVAL_SECS, m.interval_secs
            )));
        }
        Ok(())
    }
}

/// Search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Directory containing the profile models
    pub hmm_dir: PathBuf,
    /// Extension identifying model files
    pub model_extension: String,
    /// Search binary
    pub hmmsearch: PathBuf,
    /// Thread budget (None = available parallelism)
    pub threads: Option<usize>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            hmm_dir: PathBuf::from("data/hmm_models"),
            model_extension: DEFAULT_MODEL_EXTENSION.to_string(),
            hmmsearch: PathBuf::from(DEFAULT_BINARY),
            threads: None,
        }
    }
}

/// Classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingSettings {
    /// Keyword → family label mapping file (JSON or YAML)
    pub cas_types_file: Option<PathBuf>,
    /// Keep only the best hit per protein
    pub dedup_by_query: bool,
}

impl Default for TypingSettings {
    fn default() -> Self {
        Self {
            cas_types_file: Some(PathBuf::from("data/cas_types.json")),
            dedup_by_query: false,
        }
    }
}

/// Sequence input settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceSettings {
    /// Minimum protein length
    pub min_length: usize,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
        }
    }
}

/// Memory monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub enabled: bool,
    /// Percent
    pub warning_threshold: f64,
    /// Percent
    pub critical_threshold: f64,
    /// Seconds between samples
    pub interval_secs: f64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        let defaults = MonitorConfig::default();
        Self {
            enabled: false,
            warning_threshold: defaults.warning_threshold,
            critical_threshold: defaults.critical_threshold,
            interval_secs: defaults.interval.as_secs_f64(),
        }
    }
}

impl MonitorSettings {
    /// Sampling interval clamped to the accepted range
    fn interval(&self) -> Duration {
        if !self.interval_secs.is_finite() {
            return MonitorConfig::default().interval;
        }
        Duration::from_secs_f64(
            self.interval_secs
                .clamp(MIN_MONITOR_INTERVAL_SECS, MAX_MONITOR_INTERVAL_SECS),
        )
    }

    pub fn to_config(&self) -> MonitorConfig {
        MonitorConfig {
            warning_threshold: self.warning_threshold,
            critical_threshold: self.critical_threshold,
            interval: self.interval(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// ERROR, WARN, INFO or DEBUG
    pub level: String,
    /// Message-only output
    pub simple: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            simple: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.search.model_extension, "hmm");
        assert_eq!(settings.search.hmmsearch, PathBuf::from("hmmsearch"));
        assert_eq!(settings.sequences.min_length, 50);
        assert!(!settings.monitor.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "search:\n  threads: 8\n  hmm_dir: /srv/models\nmonitor:\n  enabled: true\n";
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.search.threads, Some(8));
        assert_eq!(settings.search.hmm_dir, PathBuf::from("/srv/models"));
        assert_eq!(settings.search.model_extension, "hmm");
        assert!(settings.monitor.enabled);
        assert_eq!(settings.monitor.critical_threshold, 85.0);
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        settings.search.threads = Some(0);
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.monitor.warning_threshold = 90.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_monitor_config_conversion() {
        let settings = MonitorSettings {
            interval_secs: 0.0,
            ..Default::default()
        };
        assert_eq!(settings.to_config().interval, Duration::from_millis(10));
    }

    #[test]
    fn test_interval_out_of_range_is_rejected() {
        for interval_secs in [f64::INFINITY, f64::NAN, 1e300, -1.0, 0.0] {
            let mut settings = Settings::default();
            settings.monitor.interval_secs = interval_secs;
            assert!(settings.validate().is_err(), "{}", interval_secs);
            // conversion never panics, validated or not
            let interval = settings.monitor.to_config().interval;
            assert!(interval <= Duration::from_secs(86_400));
        }

        let settings: Settings =
            serde_yaml::from_str("monitor:\n  interval_secs: .inf\n").unwrap();
        assert!(settings.validate().is_err());
    }
}
