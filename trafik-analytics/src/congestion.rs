//! ## trafik-analytics::congestion
//! **Fixed-window congestion classification**
//!
//! ### Expectations:
//! - A window is congested only when it is both dense and slow
//! - Raising the vehicle count or lowering the mean speed never lowers
//!   the reported severity
//! - A snapshot referencing an unknown route degrades to a warning,
//!   never an aborted pass

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use trafik_config::AnalyticsConfig;
use trafik_core::routes::{Point, RouteTable};
use trafik_core::snapshot::{VehicleSnapshot, VehicleState};

/// Ordered congestion severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Moderate,
    Severe,
}

/// One congested window on one route at one tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CongestionPoint {
    pub route_id: String,
    /// Window bounds along the route, metres.
    pub window_start: f64,
    pub window_end: f64,
    /// Plane position of the window midpoint.
    pub location: Point,
    pub vehicle_count: usize,
    pub mean_speed: f64,
    pub severity: Severity,
    pub timestamp_ns: u64,
}

/// Windows every route and classifies each window by vehicle count and
/// mean speed.
pub struct CongestionAnalyzer {
    window_length: f64,
    density_threshold: usize,
    speed_threshold: f64,
    severe_density: usize,
    severe_speed: f64,
}

impl CongestionAnalyzer {
    pub fn new(config: &AnalyticsConfig) -> Self {
        let severe_density =
            (config.density_threshold as f64 * config.severe_density_factor).ceil() as usize;
        Self {
            window_length: config.window_length,
            density_threshold: config.density_threshold,
            speed_threshold: config.speed_threshold,
            severe_density,
            severe_speed: config.speed_threshold * config.severe_speed_factor,
        }
    }

    /// Classifies one window. Both conditions are required: a dense but
    /// flowing window is fine, a slow but sparse one too.
    #[inline]
    pub fn classify(&self, vehicle_count: usize, mean_speed: f64) -> Severity {
        if vehicle_count >= self.severe_density && mean_speed <= self.severe_speed {
            Severity::Severe
        } else if vehicle_count >= self.density_threshold && mean_speed <= self.speed_threshold {
            Severity::Moderate
        } else {
            Severity::None
        }
    }

    /// Buckets the snapshot into per-route windows and returns the
    /// congested ones. Output order is route id, then window position.
    pub fn analyze(&self, routes: &RouteTable, snapshot: &VehicleSnapshot) -> Vec<CongestionPoint> {
        let mut grouped: BTreeMap<&str, Vec<&VehicleState>> = BTreeMap::new();
        for vehicle in &snapshot.vehicles {
            grouped
                .entry(vehicle.route_id.as_str())
                .or_default()
                .push(vehicle);
        }

        let mut points = Vec::new();
        for (route_id, vehicles) in grouped {
            let route = match routes.get(route_id) {
                Ok(route) => route,
                Err(_) => {
                    warn!(route_id, "snapshot references an unknown route, skipping");
                    continue;
                }
            };

            let window_count = (route.length() / self.window_length).ceil().max(1.0) as usize;
            let mut counts = vec![0usize; window_count];
            let mut speed_sums = vec![0.0f64; window_count];
            for vehicle in vehicles {
                // progress == length falls into the last window
                let idx =
                    ((vehicle.progress / self.window_length) as usize).min(window_count - 1);
                counts[idx] += 1;
                speed_sums[idx] += vehicle.speed;
            }

            for idx in 0..window_count {
                if counts[idx] == 0 {
                    continue;
                }
                let mean_speed = speed_sums[idx] / counts[idx] as f64;
                let severity = self.classify(counts[idx], mean_speed);
                if severity == Severity::None {
                    continue;
                }

                let window_start = idx as f64 * self.window_length;
                let window_end = (window_start + self.window_length).min(route.length());
                points.push(CongestionPoint {
                    route_id: route_id.to_string(),
                    window_start,
                    window_end,
                    location: route.position_at((window_start + window_end) / 2.0),
                    vehicle_count: counts[idx],
                    mean_speed,
                    severity,
                    timestamp_ns: snapshot.timestamp_ns,
                });
            }
        }
        points
    }
}
