//! # trafik-core
//!
//! Foundation layer for the traffic simulation: route geometry, vehicle
//! classes, the capacity-bounded registry, the simulated clock and the
//! snapshot bus that feeds analytics.
//!
//! ### Expectations (Production):
//! - Deterministic iteration everywhere a seeded run can observe order
//! - No blocking on the publish path; a slow consumer displaces old ticks
//! - All distances in metres, speeds in m/s, timestamps in simulated ns
//!
//! ### Key Submodules:
//! - `routes`: polyline routes with cumulative-distance projection
//! - `vehicle`: closed class enum and the weighted spawn mix
//! - `registry`: single-owner vehicle store with a hard capacity bound
//! - `clock`: shared atomic simulated clock
//! - `snapshot`: per-tick snapshots and the bounded drop-oldest bus
//!
//! ### Future:
//! - Route graphs with junctions instead of independent polylines

pub mod clock;
pub mod registry;
pub mod routes;
pub mod snapshot;
pub mod vehicle;

pub mod prelude {
    pub use crate::clock::*;
    pub use crate::registry::*;
    pub use crate::routes::*;
    pub use crate::snapshot::*;
    pub use crate::vehicle::*;
}
