//! Configuration for the inspector engine.
//!
//! Supports YAML configuration with precedence: explicit value > file > defaults.
//! Every field carries a serde default, so a partial file (or an empty one)
//! yields a usable configuration.

use crate::error::{InspectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Metrics aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Tick interval in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// EMA weight of the previous value for frame time and fps.
    #[serde(default = "default_frame_alpha")]
    pub frame_alpha: f64,

    /// EMA weight of the previous value for the hitch readout.
    #[serde(default = "default_hitch_alpha")]
    pub hitch_alpha: f64,

    /// Frame time at or above which a frame counts as a hitch.
    #[serde(default = "default_hitch_threshold_ms")]
    pub hitch_threshold_ms: f64,

    /// Number of per-tick fps readouts retained for sparklines.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

fn default_tick_ms() -> u64 {
    1000
}
fn default_frame_alpha() -> f64 {
    0.9
}
fn default_hitch_alpha() -> f64 {
    0.7
}
fn default_hitch_threshold_ms() -> f64 {
    200.0
}
fn default_history_size() -> usize {
    120
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            frame_alpha: default_frame_alpha(),
            hitch_alpha: default_hitch_alpha(),
            hitch_threshold_ms: default_hitch_threshold_ms(),
            history_size: default_history_size(),
        }
    }
}

/// Explorer interaction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Height of one tree row in renderer pixels.
    #[serde(default = "default_line_height")]
    pub line_height: f32,

    /// Minimum gap between two accepted navigational button taps.
    #[serde(default = "default_button_debounce_ms")]
    pub button_debounce_ms: u64,

    /// Minimum gap between two accepted ribbon show/hide toggles.
    #[serde(default = "default_ribbon_debounce_ms")]
    pub ribbon_debounce_ms: u64,

    /// Scroll changes at or below this many pixels do not request a redraw.
    #[serde(default = "default_redraw_epsilon")]
    pub redraw_epsilon: f32,

    /// Distance kept between the floating panel and the viewport edges.
    #[serde(default = "default_safe_inset")]
    pub safe_inset: f32,

    /// Maximum pointer travel for a press/release pair to count as a tap.
    #[serde(default = "default_tap_slop")]
    pub tap_slop: f32,
}

fn default_line_height() -> f32 {
    20.0
}
fn default_button_debounce_ms() -> u64 {
    500
}
fn default_ribbon_debounce_ms() -> u64 {
    300
}
fn default_redraw_epsilon() -> f32 {
    0.5
}
fn default_safe_inset() -> f32 {
    16.0
}
fn default_tap_slop() -> f32 {
    8.0
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            line_height: default_line_height(),
            button_debounce_ms: default_button_debounce_ms(),
            ribbon_debounce_ms: default_ribbon_debounce_ms(),
            redraw_epsilon: default_redraw_epsilon(),
            safe_inset: default_safe_inset(),
            tap_slop: default_tap_slop(),
        }
    }
}

/// Sample store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Load time above which the ribbon shows a slow-load warning.
    #[serde(default = "default_slow_load_threshold_ms")]
    pub slow_load_threshold_ms: f64,
}

fn default_slow_load_threshold_ms() -> f64 {
    100.0
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { slow_load_threshold_ms: default_slow_load_threshold_ms() }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Metrics aggregation settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Explorer interaction settings.
    #[serde(default)]
    pub explorer: ExplorerConfig,

    /// Sample store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

impl InspectorConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config location: `<config dir>/trueno-inspect/config.yaml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("trueno-inspect").join("config.yaml"))
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| InspectorError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails, or
    /// [`InspectorError::ConfigInvalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map(|l| l.line()).unwrap_or(0);
            InspectorError::ConfigParse { line, message: e.to_string() }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`InspectorError::ConfigInvalid`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| InspectorError::ConfigInvalid {
            key: key.to_string(),
            message: message.to_string(),
        };

        if self.metrics.tick_ms == 0 {
            return Err(invalid("metrics.tick_ms", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.metrics.frame_alpha) {
            return Err(invalid("metrics.frame_alpha", "must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.metrics.hitch_alpha) {
            return Err(invalid("metrics.hitch_alpha", "must be in [0, 1)"));
        }
        if self.metrics.history_size == 0 {
            return Err(invalid("metrics.history_size", "must be positive"));
        }
        if !positive(self.metrics.hitch_threshold_ms) {
            return Err(invalid("metrics.hitch_threshold_ms", "must be positive"));
        }
        if !positive(f64::from(self.explorer.line_height)) {
            return Err(invalid("explorer.line_height", "must be positive"));
        }

        let non_negative = [
            ("explorer.redraw_epsilon", f64::from(self.explorer.redraw_epsilon)),
            ("explorer.safe_inset", f64::from(self.explorer.safe_inset)),
            ("explorer.tap_slop", f64::from(self.explorer.tap_slop)),
            ("store.slow_load_threshold_ms", self.store.slow_load_threshold_ms),
        ];
        for (key, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(key, "must be a finite, non-negative number"));
            }
        }
        Ok(())
    }

    /// Returns the tick interval as a Duration.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.metrics.tick_ms)
    }

    /// Loads configuration with fallback to defaults.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(error = %e, "using default inspector configuration");
                Self::default()
            }
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
