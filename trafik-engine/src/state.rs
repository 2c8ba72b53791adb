//! ## trafik-engine::state
//!
//! Owned simulation world state.
//!
//! Everything the stepper mutates lives here as a plain owned value. The
//! route table is behind an `Arc` so the analysis side of the runtime can
//! share it without taking part in stepping.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use trafik_config::{TrafikConfig, VehicleMixConfig};
use trafik_core::clock::SimClock;
use trafik_core::registry::VehicleRegistry;
use trafik_core::routes::RouteTable;
use trafik_core::vehicle::{KindProfile, VehicleMix};

use crate::error::EngineError;

/// The complete mutable state of one simulation run.
///
/// Constructed once per run from validated configuration. Seeded runs get
/// a clock epoch of zero so replays produce identical timestamps.
pub struct SimulationState {
    pub routes: Arc<RouteTable>,
    pub registry: VehicleRegistry,
    pub mix: VehicleMix,
    pub rng: SmallRng,
    pub clock: SimClock,
    pub tick: u64,
}

impl SimulationState {
    pub fn from_config(config: &TrafikConfig) -> Result<Self, EngineError> {
        let routes = build_routes(config)?;
        let mix = VehicleMix::new(mix_profiles(&config.vehicles))?;

        let rng = match config.engine.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        let epoch_ns = match config.engine.seed {
            Some(_) => 0,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("Time went backwards")
                .as_nanos() as u64,
        };

        Ok(Self {
            routes: Arc::new(routes),
            registry: VehicleRegistry::new(config.engine.max_vehicles),
            mix,
            rng,
            clock: SimClock::new(epoch_ns),
            tick: 0,
        })
    }
}

/// Builds the route table from a YAML file when one is configured,
/// otherwise generates a deterministic synthetic grid.
pub(crate) fn build_routes(config: &TrafikConfig) -> Result<RouteTable, EngineError> {
    let routes = match &config.routes.path {
        Some(path) => RouteTable::from_yaml_file(path)?,
        None => RouteTable::generate(config.routes.seed, config.routes.count)?,
    };
    Ok(routes)
}

pub(crate) fn mix_profiles(config: &VehicleMixConfig) -> [KindProfile; 4] {
    config.classes().map(|class| KindProfile {
        weight: class.weight,
        speed_min: class.speed_min,
        speed_max: class.speed_max,
    })
}
