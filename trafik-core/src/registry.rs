//! ## trafik-core::registry
//! **Capacity-bounded vehicle store**
//!
//! ### Expectations (Production):
//! - Owned by the stepper task only; readers see published snapshots
//! - The global cap is checked before any randomness is consumed, so a
//!   refused admission leaves the run's random sequence untouched
//! - Iteration is id order, keeping seeded replays deterministic

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::Rng;
use thiserror::Error;

use crate::routes::Route;
use crate::vehicle::{Vehicle, VehicleId, VehicleMix};

/// Registry error conditions.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Vehicle capacity exceeded (cap: {cap})")]
    CapacityExceeded { cap: usize },
}

/// Owns every live vehicle in the simulation.
pub struct VehicleRegistry {
    vehicles: BTreeMap<VehicleId, Vehicle>,
    next_id: u64,
    cap: usize,
}

impl VehicleRegistry {
    pub fn new(cap: usize) -> Self {
        Self {
            vehicles: BTreeMap::new(),
            next_id: 1,
            cap,
        }
    }

    /// Admits a new vehicle at the start of `route`.
    ///
    /// Initial speed is sampled below 80% of the drawn cruise speed, so
    /// fresh vehicles accelerate into traffic instead of arriving at it.
    pub fn spawn(
        &mut self,
        route: &Route,
        mix: &VehicleMix,
        rng: &mut SmallRng,
        now_ns: u64,
    ) -> Result<VehicleId, RegistryError> {
        if self.vehicles.len() >= self.cap {
            return Err(RegistryError::CapacityExceeded { cap: self.cap });
        }

        let (kind, base_speed) = mix.draw(rng, route.speed_limit);
        let speed = rng.random_range(0.0..0.8 * base_speed);
        let id = VehicleId(self.next_id);
        self.next_id += 1;

        self.vehicles.insert(
            id,
            Vehicle {
                id,
                kind,
                route_id: route.id.clone(),
                progress: 0.0,
                speed,
                base_speed,
                spawned_at_ns: now_ns,
            },
        );
        Ok(id)
    }

    pub fn remove(&mut self, id: VehicleId) -> Option<Vehicle> {
        self.vehicles.remove(&id)
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    /// Vehicles in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Vehicle> {
        self.vehicles.values_mut()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Live counts indexed by `VehicleKind::index()`.
    pub fn count_by_kind(&self) -> [usize; 4] {
        let mut counts = [0usize; 4];
        for vehicle in self.vehicles.values() {
            counts[vehicle.kind.index()] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::Point;
    use crate::vehicle::{KindProfile, VehicleKind};
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn test_route() -> Route {
        Route::new(
            "route_01".into(),
            "Main Street".into(),
            vec![Point { x: 0.0, y: 0.0 }, Point { x: 500.0, y: 0.0 }],
            28.0,
        )
        .unwrap()
    }

    fn test_mix() -> VehicleMix {
        VehicleMix::new([
            KindProfile {
                weight: 0.7,
                speed_min: 22.0,
                speed_max: 33.0,
            },
            KindProfile {
                weight: 0.15,
                speed_min: 17.0,
                speed_max: 25.0,
            },
            KindProfile {
                weight: 0.1,
                speed_min: 14.0,
                speed_max: 22.0,
            },
            KindProfile {
                weight: 0.05,
                speed_min: 25.0,
                speed_max: 39.0,
            },
        ])
        .unwrap()
    }

    #[test]
    fn assigns_monotonic_ids() {
        let route = test_route();
        let mix = test_mix();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut registry = VehicleRegistry::new(8);

        let a = registry.spawn(&route, &mix, &mut rng, 0).unwrap();
        let b = registry.spawn(&route, &mix, &mut rng, 0).unwrap();
        assert_eq!(a, VehicleId(1));
        assert_eq!(b, VehicleId(2));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn refuses_spawn_at_cap_without_side_effects() {
        let route = test_route();
        let mix = test_mix();
        let mut rng = SmallRng::seed_from_u64(2);
        let mut registry = VehicleRegistry::new(2);

        registry.spawn(&route, &mix, &mut rng, 0).unwrap();
        registry.spawn(&route, &mix, &mut rng, 0).unwrap();

        let mut untouched = rng.clone();
        let refused = registry.spawn(&route, &mix, &mut rng, 0);
        assert!(matches!(
            refused,
            Err(RegistryError::CapacityExceeded { cap: 2 })
        ));
        assert_eq!(registry.len(), 2);

        // the refused admission consumed no randomness and no id
        assert_eq!(rng.random_range(0..u64::MAX), untouched.random_range(0..u64::MAX));
        registry.remove(VehicleId(1)).unwrap();
        let next = registry.spawn(&route, &mix, &mut rng, 0).unwrap();
        assert_eq!(next, VehicleId(3));
    }

    #[test]
    fn initial_speed_stays_below_cruise_speed() {
        let route = test_route();
        let mix = test_mix();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut registry = VehicleRegistry::new(64);

        for _ in 0..64 {
            let id = registry.spawn(&route, &mix, &mut rng, 0).unwrap();
            let vehicle = registry.get(id).unwrap();
            assert!(vehicle.speed >= 0.0);
            assert!(vehicle.speed < vehicle.base_speed);
            assert_eq!(vehicle.progress, 0.0);
        }
    }

    #[test]
    fn counts_vehicles_per_kind() {
        let route = test_route();
        let mix = VehicleMix::new([
            KindProfile {
                weight: 0.0,
                speed_min: 22.0,
                speed_max: 33.0,
            },
            KindProfile {
                weight: 1.0,
                speed_min: 17.0,
                speed_max: 25.0,
            },
            KindProfile {
                weight: 0.0,
                speed_min: 14.0,
                speed_max: 22.0,
            },
            KindProfile {
                weight: 0.0,
                speed_min: 25.0,
                speed_max: 39.0,
            },
        ])
        .unwrap();
        let mut rng = SmallRng::seed_from_u64(4);
        let mut registry = VehicleRegistry::new(8);
        for _ in 0..5 {
            registry.spawn(&route, &mix, &mut rng, 0).unwrap();
        }

        let counts = registry.count_by_kind();
        assert_eq!(counts[VehicleKind::Truck.index()], 5);
        assert_eq!(counts[VehicleKind::Car.index()], 0);
    }

    proptest! {
        #[test]
        fn live_count_never_exceeds_cap(
            ops in proptest::collection::vec(any::<bool>(), 1..200),
            cap in 1usize..16,
        ) {
            let route = test_route();
            let mix = test_mix();
            let mut rng = SmallRng::seed_from_u64(0);
            let mut registry = VehicleRegistry::new(cap);

            for spawn in ops {
                if spawn {
                    let _ = registry.spawn(&route, &mix, &mut rng, 0);
                } else {
                    let first_id = registry.iter().next().map(|v| v.id);
                    if let Some(id) = first_id {
                        registry.remove(id);
                    }
                }
                prop_assert!(registry.len() <= cap);
            }
        }
    }
}
