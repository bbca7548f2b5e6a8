//! Node settings

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ace_regulation::DataSource;
use ace_tuner::TunerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine settings path")]
    NoConfigDir,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Simulated ownship position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimulatedPosition {
    pub lat: f32,
    pub lon: f32,
}

impl Default for SimulatedPosition {
    fn default() -> Self {
        // Over the Netherlands
        Self { lat: 52.0, lon: 5.0 }
    }
}

/// Node settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Protocols to receive and transmit, in priority order
    pub protocols: Vec<DataSource>,
    /// Number of simulated radios (1 or 2)
    pub radio_count: u8,
    pub position: SimulatedPosition,
    /// Simulated aircraft receptions per second
    pub traffic_per_second: f32,
    /// Interval between status reports in seconds
    pub status_interval_secs: u64,
    /// Stop after this many seconds, run until ctrl-c if absent
    pub run_for_secs: Option<u64>,
    pub tuner: TunerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            protocols: vec![DataSource::Flarm, DataSource::Ogn1, DataSource::Adsl],
            radio_count: 1,
            position: SimulatedPosition::default(),
            traffic_per_second: 2.0,
            status_interval_secs: 10,
            run_for_secs: None,
            tuner: TunerConfig::default(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for ace-node
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("ace-node"));
            }
        }

        dirs::config_dir().map(|p| p.join("ace-node"))
    }

    /// Default settings file path
    pub fn settings_path() -> Result<PathBuf, SettingsError> {
        Self::config_dir()
            .map(|p| p.join("settings.json"))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Load settings from `path`, defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(serde_json::from_str(&json)?)
    }

    /// Interval between simulated receptions, `None` when traffic is off
    pub fn traffic_interval(&self) -> Option<Duration> {
        if !self.traffic_per_second.is_finite() || self.traffic_per_second <= 0.0 {
            return None;
        }
        // Rates too small to express as an interval turn traffic off
        Duration::try_from_secs_f32(1.0 / self.traffic_per_second)
            .ok()
            .map(|every| every.max(Duration::from_millis(1)))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.max(1))
    }
}
