//! ## trafik-engine::stepper
//! **Single-owner tick loop**
//!
//! ### Expectations (Production):
//! - One stepper per run; it owns the world state and nothing else
//!   mutates it
//! - A tick runs four phases in order: advance, despawn, spawn, publish
//! - Phase order and id-ordered iteration make seeded runs replayable
//!   bit for bit
//!
//! ### Phases:
//! - Advance: move every vehicle by its held speed, then re-jitter the
//!   speed around its cruise speed
//! - Despawn: arrivals leave immediately, the rest leave with the
//!   configured probability
//! - Spawn: one admission attempt per route, refused without side
//!   effects at the capacity cap
//! - Publish: project positions and emit an immutable snapshot

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, warn};
use trafik_config::{TrafficProfileConfig, TrafikConfig};
use trafik_core::registry::RegistryError;
use trafik_core::routes::RouteTable;
use trafik_core::snapshot::{VehicleSnapshot, VehicleState};

use crate::error::EngineError;
use crate::state::SimulationState;

const NS_PER_HOUR: u64 = 3_600_000_000_000;

/// Speed floor for rush-hour slowdowns, m/s. Keeps congested traffic
/// crawling instead of parking.
const RUSH_FLOOR_MPS: f64 = 1.5;

/// What one `step` produced.
#[derive(Debug)]
pub struct TickOutcome {
    pub snapshot: VehicleSnapshot,
    pub spawned: usize,
    pub despawned: usize,
    pub capacity_rejections: usize,
    /// Live counts after the tick, indexed by `VehicleKind::index()`.
    pub by_kind: [usize; 4],
}

/// Rush-hour parameters resolved from configuration.
struct ProfileParams {
    enabled: bool,
    morning: (u32, u32),
    evening: (u32, u32),
    spawn_multiplier: f64,
    speed_factor: f64,
    affected_share: f64,
}

impl ProfileParams {
    fn from_config(config: &TrafficProfileConfig) -> Self {
        Self {
            enabled: config.enabled,
            morning: (config.morning_start, config.morning_end),
            evening: (config.evening_start, config.evening_end),
            spawn_multiplier: config.spawn_multiplier,
            speed_factor: config.speed_factor,
            affected_share: config.affected_share,
        }
    }

    /// Whether the simulated hour-of-day falls inside a rush window.
    fn active(&self, now_ns: u64) -> bool {
        if !self.enabled {
            return false;
        }
        let hour = ((now_ns / NS_PER_HOUR) % 24) as u32;
        (self.morning.0..self.morning.1).contains(&hour)
            || (self.evening.0..self.evening.1).contains(&hour)
    }
}

/// Advances the simulation one tick at a time.
pub struct Stepper {
    state: SimulationState,
    tick_duration_ns: u64,
    /// Per-route admission probability, aligned with `routes.all()`.
    spawn_probabilities: Vec<f64>,
    despawn_probability: f64,
    speed_jitter: f64,
    profile: ProfileParams,
}

impl Stepper {
    pub fn new(config: &TrafikConfig) -> Result<Self, EngineError> {
        let state = SimulationState::from_config(config)?;

        let mut spawn_probabilities = vec![config.engine.spawn_probability; state.routes.len()];
        for (route_id, probability) in &config.routes.spawn_overrides {
            match state.routes.all().iter().position(|r| &r.id == route_id) {
                Some(idx) => spawn_probabilities[idx] = *probability,
                None => warn!(
                    route_id = %route_id,
                    "spawn override references an unknown route, ignoring"
                ),
            }
        }

        Ok(Self {
            state,
            tick_duration_ns: config.engine.tick_duration_ms * 1_000_000,
            spawn_probabilities,
            despawn_probability: config.engine.despawn_probability,
            speed_jitter: config.engine.speed_jitter,
            profile: ProfileParams::from_config(&config.profile),
        })
    }

    /// Shared handle to the immutable route table.
    pub fn routes(&self) -> Arc<RouteTable> {
        Arc::clone(&self.state.routes)
    }

    pub fn tick(&self) -> u64 {
        self.state.tick
    }

    pub fn live_vehicles(&self) -> usize {
        self.state.registry.len()
    }

    /// Runs one tick and returns the published snapshot plus counters.
    pub fn step(&mut self) -> TickOutcome {
        self.state.clock.advance(self.tick_duration_ns);
        self.state.tick += 1;

        let dt_secs = self.tick_duration_ns as f64 / 1e9;
        let SimulationState {
            routes,
            registry,
            mix,
            rng,
            clock,
            tick,
        } = &mut self.state;
        let now_ns = clock.now_ns();
        let rush = self.profile.active(now_ns);

        // Advance
        let mut lost = Vec::new();
        for vehicle in registry.iter_mut() {
            let route = match routes.get(&vehicle.route_id) {
                Ok(route) => route,
                Err(_) => {
                    warn!(
                        vehicle = %vehicle.id,
                        route_id = %vehicle.route_id,
                        "vehicle references an unknown route, removing"
                    );
                    lost.push(vehicle.id);
                    continue;
                }
            };
            vehicle.progress = (vehicle.progress + vehicle.speed * dt_secs).min(route.length());

            let jitter = rng.random_range(-self.speed_jitter..=self.speed_jitter);
            vehicle.speed =
                (vehicle.speed + jitter * vehicle.base_speed).clamp(0.0, vehicle.base_speed);
            if rush && rng.random_bool(self.profile.affected_share) {
                vehicle.speed = (vehicle.speed * self.profile.speed_factor).max(RUSH_FLOOR_MPS);
            }
        }
        for id in lost {
            registry.remove(id);
        }

        // Despawn
        let mut departed = Vec::new();
        for vehicle in registry.iter() {
            let arrived = routes
                .get(&vehicle.route_id)
                .map(|route| vehicle.progress >= route.length())
                .unwrap_or(true);
            if arrived || rng.random_bool(self.despawn_probability) {
                departed.push(vehicle.id);
            }
        }
        let despawned = departed.len();
        for id in departed {
            registry.remove(id);
        }

        // Spawn
        let mut spawned = 0;
        let mut capacity_rejections = 0;
        for (idx, route) in routes.all().iter().enumerate() {
            let mut probability = self.spawn_probabilities[idx];
            if rush {
                probability = (probability * self.profile.spawn_multiplier).min(1.0);
            }
            if !rng.random_bool(probability) {
                continue;
            }
            match registry.spawn(route, mix, rng, now_ns) {
                Ok(_) => spawned += 1,
                Err(RegistryError::CapacityExceeded { cap }) => {
                    capacity_rejections += 1;
                    debug!(route_id = %route.id, cap, "admission refused at capacity");
                }
            }
        }

        // Publish
        let mut vehicles = Vec::with_capacity(registry.len());
        for vehicle in registry.iter() {
            let Ok(route) = routes.get(&vehicle.route_id) else {
                continue;
            };
            let position = route.position_at(vehicle.progress);
            vehicles.push(VehicleState {
                id: vehicle.id,
                kind: vehicle.kind,
                route_id: vehicle.route_id.clone(),
                progress: vehicle.progress,
                x: position.x,
                y: position.y,
                speed: vehicle.speed,
            });
        }

        TickOutcome {
            snapshot: VehicleSnapshot {
                tick: *tick,
                timestamp_ns: now_ns,
                vehicles,
            },
            spawned,
            despawned,
            capacity_rejections,
            by_kind: registry.count_by_kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::mix_profiles;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use trafik_config::VehicleMixConfig;
    use trafik_core::clock::SimClock;
    use trafik_core::registry::VehicleRegistry;
    use trafik_core::routes::{Point, RouteSpec};
    use trafik_core::vehicle::VehicleMix;

    fn one_route_state(length: f64, cap: usize, seed: u64) -> SimulationState {
        let spec = RouteSpec {
            id: "route_01".into(),
            name: "Main Street".into(),
            waypoints: vec![Point { x: 0.0, y: 0.0 }, Point { x: length, y: 0.0 }],
            speed_limit: 28.0,
        };
        SimulationState {
            routes: Arc::new(RouteTable::from_specs(&[spec]).unwrap()),
            registry: VehicleRegistry::new(cap),
            mix: VehicleMix::new(mix_profiles(&VehicleMixConfig::default())).unwrap(),
            rng: SmallRng::seed_from_u64(seed),
            clock: SimClock::new(0),
            tick: 0,
        }
    }

    /// No spawns, no random despawns, no jitter, no rush hour.
    fn quiet_stepper(length: f64, cap: usize) -> Stepper {
        Stepper {
            state: one_route_state(length, cap, 1),
            tick_duration_ns: 1_000_000_000,
            spawn_probabilities: vec![0.0],
            despawn_probability: 0.0,
            speed_jitter: 0.0,
            profile: ProfileParams::from_config(&TrafficProfileConfig::default()),
        }
    }

    #[test]
    fn ticks_without_vehicles_publish_empty_snapshots() {
        let mut stepper = quiet_stepper(100.0, 4);
        let outcome = stepper.step();
        assert_eq!(outcome.snapshot.tick, 1);
        assert_eq!(outcome.snapshot.timestamp_ns, 1_000_000_000);
        assert!(outcome.snapshot.vehicles.is_empty());
        assert_eq!(outcome.by_kind, [0, 0, 0, 0]);
    }

    #[test]
    fn arrivals_leave_during_their_final_tick() {
        let mut stepper = quiet_stepper(10.0, 4);
        let route = stepper.state.routes.all()[0].clone();
        let id = stepper
            .state
            .registry
            .spawn(&route, &stepper.state.mix, &mut stepper.state.rng, 0)
            .unwrap();
        for vehicle in stepper.state.registry.iter_mut() {
            vehicle.progress = 9.5;
            vehicle.speed = 1.0;
            vehicle.base_speed = 1.0;
        }

        let outcome = stepper.step();
        assert_eq!(outcome.despawned, 1);
        assert!(outcome.snapshot.vehicles.is_empty());
        assert!(stepper.state.registry.get(id).is_none());

        let next = stepper.step();
        assert!(next.snapshot.vehicles.iter().all(|v| v.id != id));
    }

    #[test]
    fn refused_admissions_are_counted_at_cap() {
        let mut stepper = quiet_stepper(1000.0, 1);
        stepper.spawn_probabilities = vec![1.0];

        let first = stepper.step();
        assert_eq!(first.spawned, 1);
        assert_eq!(first.capacity_rejections, 0);

        let second = stepper.step();
        assert_eq!(second.spawned, 0);
        assert_eq!(second.capacity_rejections, 1);
        assert_eq!(stepper.state.registry.len(), 1);
    }

    #[test]
    fn vehicles_on_unknown_routes_are_removed() {
        let mut stepper = quiet_stepper(100.0, 4);
        let route = stepper.state.routes.all()[0].clone();
        stepper
            .state
            .registry
            .spawn(&route, &stepper.state.mix, &mut stepper.state.rng, 0)
            .unwrap();
        for vehicle in stepper.state.registry.iter_mut() {
            vehicle.route_id = "route_99".into();
        }

        let outcome = stepper.step();
        assert!(outcome.snapshot.vehicles.is_empty());
        assert!(stepper.state.registry.is_empty());
    }

    #[test]
    fn seeded_steppers_replay_identically() {
        let mut config = TrafikConfig::default();
        config.engine.seed = Some(42);
        config.engine.spawn_probability = 0.5;

        let mut a = Stepper::new(&config).unwrap();
        let mut b = Stepper::new(&config).unwrap();
        for _ in 0..30 {
            let oa = a.step();
            let ob = b.step();
            assert_eq!(oa.snapshot.tick, ob.snapshot.tick);
            assert_eq!(oa.snapshot.timestamp_ns, ob.snapshot.timestamp_ns);
            assert_eq!(oa.snapshot.vehicles.len(), ob.snapshot.vehicles.len());
            for (va, vb) in oa.snapshot.vehicles.iter().zip(&ob.snapshot.vehicles) {
                assert_eq!(va.id, vb.id);
                assert_eq!(va.kind, vb.kind);
                assert_eq!(va.route_id, vb.route_id);
                assert_eq!(va.progress, vb.progress);
                assert_eq!(va.speed, vb.speed);
            }
        }
    }

    #[test]
    fn spawn_overrides_apply_per_route() {
        let mut config = TrafikConfig::default();
        config.engine.seed = Some(5);
        config.routes.count = 3;
        config.routes.spawn_overrides.insert("route_02".into(), 0.0);
        config.routes.spawn_overrides.insert("route_77".into(), 1.0);

        let stepper = Stepper::new(&config).unwrap();
        assert_eq!(stepper.spawn_probabilities.len(), 3);
        assert_eq!(
            stepper.spawn_probabilities[0],
            config.engine.spawn_probability
        );
        assert_eq!(stepper.spawn_probabilities[1], 0.0);
        assert_eq!(
            stepper.spawn_probabilities[2],
            config.engine.spawn_probability
        );
    }

    #[test]
    fn rush_windows_follow_the_simulated_clock() {
        let profile = ProfileParams {
            enabled: true,
            morning: (7, 9),
            evening: (17, 19),
            spawn_multiplier: 1.67,
            speed_factor: 0.6,
            affected_share: 0.3,
        };
        assert!(!profile.active(0));
        assert!(profile.active(7 * NS_PER_HOUR));
        assert!(profile.active(8 * NS_PER_HOUR + 1));
        assert!(!profile.active(9 * NS_PER_HOUR));
        assert!(profile.active(18 * NS_PER_HOUR));
        assert!(!profile.active(26 * NS_PER_HOUR));
        assert!(profile.active(31 * NS_PER_HOUR));

        let disabled = ProfileParams::from_config(&TrafficProfileConfig::default());
        assert!(!disabled.active(8 * NS_PER_HOUR));
    }

    #[test]
    fn rush_windows_slow_affected_vehicles() {
        let mut stepper = quiet_stepper(100_000.0, 32);
        stepper.spawn_probabilities = vec![1.0];
        stepper.profile = ProfileParams {
            enabled: true,
            morning: (0, 23),
            evening: (23, 23),
            spawn_multiplier: 1.0,
            speed_factor: 0.5,
            affected_share: 1.0,
        };

        for _ in 0..6 {
            stepper.step();
        }
        // vehicles admitted on the final tick have not been advanced yet
        for vehicle in stepper.state.registry.iter().filter(|v| v.progress > 0.0) {
            assert!(vehicle.speed <= (0.5 * vehicle.base_speed).max(RUSH_FLOOR_MPS) + 1e-9);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn progress_and_speed_stay_bounded(seed in 0u64..1000, ticks in 1usize..60) {
            let mut config = TrafikConfig::default();
            config.engine.seed = Some(seed);
            config.engine.spawn_probability = 0.8;
            config.engine.despawn_probability = 0.05;

            let mut stepper = Stepper::new(&config).unwrap();
            for _ in 0..ticks {
                let outcome = stepper.step();
                for state in &outcome.snapshot.vehicles {
                    let route = stepper.state.routes.get(&state.route_id).unwrap();
                    prop_assert!(state.progress >= 0.0);
                    prop_assert!(state.progress <= route.length());
                    prop_assert!(state.speed >= 0.0);
                }
                for vehicle in stepper.state.registry.iter() {
                    prop_assert!(vehicle.speed <= vehicle.base_speed);
                }
            }
        }
    }
}
