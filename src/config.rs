//! Configuration for an analysis run.
//!
//! A run is configured once, up front, and the resulting [`AnalysisConfig`]
//! is passed by reference into every stage. The reconstruction window can
//! come straight from the command line or from the recorder's JSON
//! configuration file.

use crate::core::windowing::MICROS_PER_SEC;
use crate::error::{AnalysisError, Result};
use crate::source::DEFAULT_SENSOR_HEIGHT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Immutable settings shared by the windowing and extraction stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Width of each reconstruction window in microseconds
    pub reconstruction_window: i64,
    /// Sensor height used for y-axis flipping
    pub sensor_height: i32,
    /// Stop after this many windows
    pub max_windows: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reconstruction_window: 1000,
            sensor_height: DEFAULT_SENSOR_HEIGHT,
            max_windows: None,
        }
    }
}

impl AnalysisConfig {
    pub fn new(reconstruction_window: i64) -> Self {
        Self {
            reconstruction_window,
            ..Self::default()
        }
    }

    pub fn with_sensor_height(mut self, sensor_height: i32) -> Self {
        self.sensor_height = sensor_height;
        self
    }

    pub fn with_max_windows(mut self, max_windows: Option<usize>) -> Self {
        self.max_windows = max_windows;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.reconstruction_window <= 0 {
            return Err(AnalysisError::Config(format!(
                "reconstruction window must be greater than 0, got {}",
                self.reconstruction_window
            )));
        }
        if self.sensor_height <= 0 {
            return Err(AnalysisError::Config(format!(
                "sensor height must be greater than 0, got {}",
                self.sensor_height
            )));
        }
        Ok(())
    }
}

/// The subset of the recorder's JSON configuration this crate reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingConfig {
    /// Reconstruction window the recording was made with (µs)
    pub reconstruction_window: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_height: Option<i32>,
}

impl RecordingConfig {
    /// Load a recording configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("could not read {}: {e}", path.display()))
        })?;
        let config: RecordingConfig = serde_json::from_str(&content).map_err(|e| {
            AnalysisError::Config(format!("could not parse {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), window = config.reconstruction_window, "loaded recording config");
        Ok(config)
    }

    /// Save the configuration as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build the run configuration this recording implies.
    pub fn to_analysis_config(&self) -> Result<AnalysisConfig> {
        let config = AnalysisConfig {
            reconstruction_window: self.reconstruction_window,
            sensor_height: self.sensor_height.unwrap_or(DEFAULT_SENSOR_HEIGHT),
            max_windows: None,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Resolve a reconstruction window argument.
///
/// Accepts either a positive integer (µs) or the path of a `.json`
/// recording configuration carrying `reconstructionWindow`.
pub fn parse_reconstruction_window(arg: &str) -> Result<i64> {
    let arg = arg.trim();

    if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) {
        return match arg.parse::<i64>() {
            Ok(0) => Err(AnalysisError::Config(
                "the reconstruction window must be greater than 0".to_string(),
            )),
            Ok(window) => Ok(window),
            Err(e) => Err(AnalysisError::Config(format!(
                "reconstruction window {arg} is not usable: {e}"
            ))),
        };
    }

    let unsigned = arg.strip_prefix('-').unwrap_or(arg);
    if !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AnalysisError::Config(
            "the reconstruction window must be greater than 0".to_string(),
        ));
    }

    let path = Path::new(arg);
    if path.is_file() && arg.ends_with(".json") {
        let config = RecordingConfig::load(path)?;
        return config.to_analysis_config().map(|c| c.reconstruction_window);
    }

    Err(AnalysisError::Config(format!(
        "the path {arg} does not point to a json file"
    )))
}

/// Number of windows needed to cover `xlim_secs` seconds of recording.
pub fn max_windows_for_xlim(xlim_secs: f64, reconstruction_window: i64) -> Result<usize> {
    if !xlim_secs.is_finite() || xlim_secs <= 0.0 {
        return Err(AnalysisError::Argument(
            "the plot x limit must be greater than 0".to_string(),
        ));
    }
    if reconstruction_window <= 0 {
        return Err(AnalysisError::Config(format!(
            "reconstruction window must be greater than 0, got {reconstruction_window}"
        )));
    }
    Ok(((xlim_secs * MICROS_PER_SEC) / reconstruction_window as f64).floor() as usize)
}
