//! Congestion analysis configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Windowed congestion classification thresholds.
///
/// A window is congested when it holds at least `density_threshold`
/// vehicles whose mean speed is at or below `speed_threshold`. The
/// severe factors tighten both conditions for the higher severity.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct AnalyticsConfig {
    /// Window length along a route, metres.
    #[serde(default = "default_window_length")]
    #[validate(range(min = 1.0, max = 10000.0))]
    pub window_length: f64,

    /// Minimum vehicle count in one window.
    #[serde(default = "default_density_threshold")]
    #[validate(range(min = 1, max = 10000))]
    pub density_threshold: usize,

    /// Mean speed bound, m/s.
    #[serde(default = "default_speed_threshold")]
    #[validate(range(min = 0.1, max = 100.0))]
    pub speed_threshold: f64,

    /// Count multiplier for the severe classification.
    #[serde(default = "default_severe_density_factor")]
    #[validate(range(min = 1.0, max = 100.0))]
    pub severe_density_factor: f64,

    /// Speed multiplier for the severe classification.
    #[serde(default = "default_severe_speed_factor")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub severe_speed_factor: f64,
}

fn default_window_length() -> f64 {
    100.0
}

fn default_density_threshold() -> usize {
    5
}

fn default_speed_threshold() -> f64 {
    10.0
}

fn default_severe_density_factor() -> f64 {
    2.0
}

fn default_severe_speed_factor() -> f64 {
    0.5
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_length: default_window_length(),
            density_threshold: default_density_threshold(),
            speed_threshold: default_speed_threshold(),
            severe_density_factor: default_severe_density_factor(),
            severe_speed_factor: default_severe_speed_factor(),
        }
    }
}
