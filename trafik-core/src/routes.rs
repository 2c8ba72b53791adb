//! Route geometry and the immutable route table.
//!
//! A route is a directed polyline. Vehicle movement is one-dimensional
//! (a progress offset along the line); cumulative per-waypoint distances
//! are precomputed so projecting progress back onto plane coordinates is
//! a binary search plus one interpolation.

use std::collections::HashMap;
use std::path::Path;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Route error conditions.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("Unknown route id: {0}")]
    Unknown(String),
    #[error("Degenerate route geometry for '{id}': {reason}")]
    Geometry { id: String, reason: String },
    #[error("Duplicate route id: {0}")]
    Duplicate(String),
    #[error("I/O error reading route file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed route file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Planar position in metres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Serde shape for one route in a YAML route file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteSpec {
    pub id: String,
    pub name: String,
    pub waypoints: Vec<Point>,
    pub speed_limit: f64,
}

/// Directed polyline a vehicle travels along.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub id: String,
    pub name: String,
    /// Posted limit in m/s. Caps sampled cruise speeds and feeds route
    /// statistics; it is not enforced tick-to-tick.
    pub speed_limit: f64,
    waypoints: Vec<Point>,
    cumulative: Vec<f64>,
    length: f64,
}

impl Route {
    pub fn new(
        id: String,
        name: String,
        waypoints: Vec<Point>,
        speed_limit: f64,
    ) -> Result<Self, RouteError> {
        if waypoints.len() < 2 {
            return Err(RouteError::Geometry {
                id,
                reason: format!("needs at least 2 waypoints, got {}", waypoints.len()),
            });
        }

        let mut cumulative = Vec::with_capacity(waypoints.len());
        cumulative.push(0.0);
        let mut total = 0.0;
        for pair in waypoints.windows(2) {
            total += pair[0].distance(&pair[1]);
            cumulative.push(total);
        }

        if total <= 0.0 {
            return Err(RouteError::Geometry {
                id,
                reason: "total length is zero".into(),
            });
        }

        Ok(Self {
            id,
            name,
            speed_limit,
            waypoints,
            cumulative,
            length: total,
        })
    }

    /// Total length in metres, always positive.
    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    /// Projects a progress offset onto plane coordinates.
    ///
    /// Progress is clamped to `[0, length]`; zero-length segments are
    /// skipped by the search.
    pub fn position_at(&self, progress: f64) -> Point {
        let progress = progress.clamp(0.0, self.length);
        let seg = self.cumulative.partition_point(|&d| d <= progress);
        if seg >= self.cumulative.len() {
            return self.waypoints[self.waypoints.len() - 1];
        }

        let start = self.waypoints[seg - 1];
        let end = self.waypoints[seg];
        let seg_start = self.cumulative[seg - 1];
        let seg_len = self.cumulative[seg] - seg_start;
        if seg_len <= f64::EPSILON {
            return start;
        }

        let t = (progress - seg_start) / seg_len;
        Point {
            x: start.x + (end.x - start.x) * t,
            y: start.y + (end.y - start.y) * t,
        }
    }
}

const STREET_NAMES: [&str; 10] = [
    "Main Street",
    "Highway 1",
    "Broadway",
    "Park Avenue",
    "Industrial Road",
    "City Center",
    "Suburban Loop",
    "Airport Highway",
    "University Drive",
    "Shopping District",
];

/// Posted limits drawn for generated routes, m/s.
const SPEED_LIMITS: [f64; 4] = [14.0, 17.0, 22.0, 28.0];

/// Side length of the generated street grid, metres.
const GRID_EXTENT: f64 = 1000.0;

/// Immutable collection of routes addressed by id.
///
/// Built once at startup; `all()` iterates in load order so seeded runs
/// visit routes deterministically.
pub struct RouteTable {
    routes: Vec<Route>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    /// Generates `count` seeded routes on a square grid. Identical seeds
    /// produce identical tables across runs.
    pub fn generate(seed: u64, count: usize) -> Result<Self, RouteError> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut routes = Vec::with_capacity(count);

        for i in 0..count {
            let name = STREET_NAMES
                .get(i)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("Route {}", i + 1));

            let mut waypoints = vec![random_point(&mut rng)];
            for _ in 0..rng.random_range(0..=2) {
                waypoints.push(random_point(&mut rng));
            }
            waypoints.push(random_point(&mut rng));

            let speed_limit = SPEED_LIMITS[rng.random_range(0..SPEED_LIMITS.len())];
            routes.push(Route::new(
                format!("route_{:02}", i + 1),
                name,
                waypoints,
                speed_limit,
            )?);
        }

        Self::from_routes(routes)
    }

    /// Builds a table from parsed route specs.
    pub fn from_specs(specs: &[RouteSpec]) -> Result<Self, RouteError> {
        let routes = specs
            .iter()
            .map(|spec| {
                Route::new(
                    spec.id.clone(),
                    spec.name.clone(),
                    spec.waypoints.clone(),
                    spec.speed_limit,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_routes(routes)
    }

    /// Loads a YAML route file (a sequence of route specs).
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RouteError> {
        let raw = std::fs::read_to_string(path)?;
        let specs: Vec<RouteSpec> = serde_yaml::from_str(&raw)?;
        Self::from_specs(&specs)
    }

    fn from_routes(routes: Vec<Route>) -> Result<Self, RouteError> {
        let mut index = HashMap::with_capacity(routes.len());
        for (i, route) in routes.iter().enumerate() {
            if index.insert(route.id.clone(), i).is_some() {
                return Err(RouteError::Duplicate(route.id.clone()));
            }
        }
        Ok(Self { routes, index })
    }

    pub fn get(&self, route_id: &str) -> Result<&Route, RouteError> {
        self.index
            .get(route_id)
            .map(|&i| &self.routes[i])
            .ok_or_else(|| RouteError::Unknown(route_id.to_string()))
    }

    /// Routes in load order.
    pub fn all(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn random_point(rng: &mut SmallRng) -> Point {
    Point {
        x: rng.random_range(0.0..GRID_EXTENT),
        y: rng.random_range(0.0..GRID_EXTENT),
    }
}
