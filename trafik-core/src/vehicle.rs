//! Vehicle classes, per-class sampling profiles and the weighted mix.

use std::fmt;

use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vehicle mix error conditions.
#[derive(Error, Debug)]
pub enum MixError {
    #[error("Class weights must be finite, non-negative and sum to more than zero")]
    InvalidWeights,
    #[error("Speed range for {kind} is invalid (min {min}, max {max})")]
    InvalidSpeedRange {
        kind: VehicleKind,
        min: f64,
        max: f64,
    },
}

/// Closed set of simulated vehicle classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    Car,
    Truck,
    Bus,
    Motorcycle,
}

impl VehicleKind {
    pub const ALL: [VehicleKind; 4] = [
        VehicleKind::Car,
        VehicleKind::Truck,
        VehicleKind::Bus,
        VehicleKind::Motorcycle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleKind::Car => "car",
            VehicleKind::Truck => "truck",
            VehicleKind::Bus => "bus",
            VehicleKind::Motorcycle => "motorcycle",
        }
    }

    /// Stable position in per-kind count arrays.
    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling profile for one vehicle class. Speeds in m/s.
#[derive(Clone, Copy, Debug)]
pub struct KindProfile {
    pub weight: f64,
    pub speed_min: f64,
    pub speed_max: f64,
}

/// Weighted class mix used when admitting vehicles.
#[derive(Clone, Debug)]
pub struct VehicleMix {
    profiles: [KindProfile; 4],
}

impl VehicleMix {
    pub fn new(profiles: [KindProfile; 4]) -> Result<Self, MixError> {
        let mut sum = 0.0;
        for (kind, profile) in VehicleKind::ALL.iter().zip(profiles.iter()) {
            if !profile.weight.is_finite() || profile.weight < 0.0 {
                return Err(MixError::InvalidWeights);
            }
            let valid_range = profile.speed_min.is_finite()
                && profile.speed_max.is_finite()
                && profile.speed_min > 0.0
                && profile.speed_min <= profile.speed_max;
            if !valid_range {
                return Err(MixError::InvalidSpeedRange {
                    kind: *kind,
                    min: profile.speed_min,
                    max: profile.speed_max,
                });
            }
            sum += profile.weight;
        }
        if sum <= 0.0 {
            return Err(MixError::InvalidWeights);
        }
        Ok(Self { profiles })
    }

    #[inline]
    pub fn profile(&self, kind: VehicleKind) -> &KindProfile {
        &self.profiles[kind.index()]
    }

    /// Draws a class per the configured weights, then samples a cruise
    /// speed within the class range. A posted limit below the class
    /// minimum loses to the minimum.
    pub fn draw(&self, rng: &mut SmallRng, speed_limit: f64) -> (VehicleKind, f64) {
        let kind = match VehicleKind::ALL.choose_weighted(rng, |k| self.profiles[k.index()].weight)
        {
            Ok(kind) => *kind,
            // new() rejects non-finite, negative and all-zero weights
            Err(_) => VehicleKind::Car,
        };
        let profile = self.profile(kind);
        let high = profile.speed_max.min(speed_limit).max(profile.speed_min);
        let base_speed = rng.random_range(profile.speed_min..=high);
        (kind, base_speed)
    }
}

/// Monotonic vehicle identifier, unique within one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{:06}", self.0)
    }
}

/// A simulated vehicle bound to one route.
#[derive(Clone, Debug)]
pub struct Vehicle {
    pub id: VehicleId,
    pub kind: VehicleKind,
    pub route_id: String,
    /// Distance travelled along the route, metres in `[0, route length]`.
    pub progress: f64,
    /// Current speed, m/s.
    pub speed: f64,
    /// Sampled cruise speed the per-tick jitter recentres on.
    pub base_speed: f64,
    pub spawned_at_ns: u64,
}
