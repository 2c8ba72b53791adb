//! Engine configuration: tick pacing, capacity and spawn behavior.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Stepper and runtime parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct EngineConfig {
    /// Simulated duration of one tick (milliseconds).
    #[serde(default = "default_tick_duration_ms")]
    #[validate(range(min = 10, max = 60000))]
    pub tick_duration_ms: u64,

    /// Hard cap on concurrently live vehicles.
    #[serde(default = "default_max_vehicles")]
    #[validate(range(min = 1, max = 100000))]
    pub max_vehicles: usize,

    /// Per-route admission probability per tick.
    #[serde(default = "default_spawn_probability")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub spawn_probability: f64,

    /// Per-vehicle probability of leaving observation each tick.
    #[serde(default = "default_despawn_probability")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub despawn_probability: f64,

    /// Per-tick speed variation as a fraction of cruise speed.
    #[serde(default = "default_speed_jitter")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub speed_jitter: f64,

    /// Snapshot bus capacity (ticks buffered before the oldest is displaced).
    #[serde(default = "default_snapshot_buffer")]
    #[validate(range(min = 2, max = 65536))]
    pub snapshot_buffer: usize,

    /// Fixed seed for deterministic runs. Unset draws entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_tick_duration_ms() -> u64 {
    1000
}

fn default_max_vehicles() -> usize {
    200
}

fn default_spawn_probability() -> f64 {
    0.3
}

fn default_despawn_probability() -> f64 {
    0.01
}

fn default_speed_jitter() -> f64 {
    0.2
}

fn default_snapshot_buffer() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_duration_ms: default_tick_duration_ms(),
            max_vehicles: default_max_vehicles(),
            spawn_probability: default_spawn_probability(),
            despawn_probability: default_despawn_probability(),
            speed_jitter: default_speed_jitter(),
            snapshot_buffer: default_snapshot_buffer(),
            seed: None,
        }
    }
}
