//! Vehicle class mix configuration.
//!
//! Weights are relative, not normalized. Speeds are m/s; the defaults
//! correspond to roughly 80-120 km/h cars, 60-90 km/h trucks,
//! 50-80 km/h buses and 90-140 km/h motorcycles.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Sampling parameters for one vehicle class.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ClassConfig {
    /// Relative spawn weight.
    #[validate(range(min = 0.0, max = 1000.0))]
    pub weight: f64,

    /// Lower cruise speed bound, m/s.
    #[validate(range(min = 0.1, max = 100.0))]
    pub speed_min: f64,

    /// Upper cruise speed bound, m/s.
    #[validate(range(min = 0.1, max = 100.0))]
    pub speed_max: f64,
}

/// Weighted class mix.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct VehicleMixConfig {
    #[serde(default = "default_car")]
    #[validate(nested)]
    pub car: ClassConfig,

    #[serde(default = "default_truck")]
    #[validate(nested)]
    pub truck: ClassConfig,

    #[serde(default = "default_bus")]
    #[validate(nested)]
    pub bus: ClassConfig,

    #[serde(default = "default_motorcycle")]
    #[validate(nested)]
    pub motorcycle: ClassConfig,
}

impl VehicleMixConfig {
    /// Classes in spawn-array order: car, truck, bus, motorcycle.
    pub fn classes(&self) -> [&ClassConfig; 4] {
        [&self.car, &self.truck, &self.bus, &self.motorcycle]
    }
}

fn default_car() -> ClassConfig {
    ClassConfig {
        weight: 0.7,
        speed_min: 22.0,
        speed_max: 33.0,
    }
}

fn default_truck() -> ClassConfig {
    ClassConfig {
        weight: 0.15,
        speed_min: 17.0,
        speed_max: 25.0,
    }
}

fn default_bus() -> ClassConfig {
    ClassConfig {
        weight: 0.1,
        speed_min: 14.0,
        speed_max: 22.0,
    }
}

fn default_motorcycle() -> ClassConfig {
    ClassConfig {
        weight: 0.05,
        speed_min: 25.0,
        speed_max: 39.0,
    }
}

impl Default for VehicleMixConfig {
    fn default() -> Self {
        Self {
            car: default_car(),
            truck: default_truck(),
            bus: default_bus(),
            motorcycle: default_motorcycle(),
        }
    }
}
