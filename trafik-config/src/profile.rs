//! Daily traffic profile configuration (rush-hour windows).

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Rush-hour behavior. Hours are simulated hour-of-day.
///
/// During an active window the spawn probability is multiplied and a
/// share of vehicles is slowed each tick.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TrafficProfileConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_morning_start")]
    #[validate(range(min = 0, max = 23))]
    pub morning_start: u32,

    #[serde(default = "default_morning_end")]
    #[validate(range(min = 0, max = 23))]
    pub morning_end: u32,

    #[serde(default = "default_evening_start")]
    #[validate(range(min = 0, max = 23))]
    pub evening_start: u32,

    #[serde(default = "default_evening_end")]
    #[validate(range(min = 0, max = 23))]
    pub evening_end: u32,

    /// Spawn probability multiplier inside a window.
    #[serde(default = "default_spawn_multiplier")]
    #[validate(range(min = 1.0, max = 10.0))]
    pub spawn_multiplier: f64,

    /// Slowdown factor applied to affected vehicles.
    #[serde(default = "default_speed_factor")]
    #[validate(range(min = 0.05, max = 1.0))]
    pub speed_factor: f64,

    /// Share of vehicles slowed per tick inside a window.
    #[serde(default = "default_affected_share")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub affected_share: f64,
}

fn default_morning_start() -> u32 {
    7
}

fn default_morning_end() -> u32 {
    9
}

fn default_evening_start() -> u32 {
    17
}

fn default_evening_end() -> u32 {
    19
}

fn default_spawn_multiplier() -> f64 {
    1.67
}

fn default_speed_factor() -> f64 {
    0.6
}

fn default_affected_share() -> f64 {
    0.3
}

impl Default for TrafficProfileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            morning_start: default_morning_start(),
            morning_end: default_morning_end(),
            evening_start: default_evening_start(),
            evening_end: default_evening_end(),
            spawn_multiplier: default_spawn_multiplier(),
            speed_factor: default_speed_factor(),
            affected_share: default_affected_share(),
        }
    }
}
