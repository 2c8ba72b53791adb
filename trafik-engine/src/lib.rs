//! # trafik-engine
//!
//! Simulation orchestration: the tick stepper, the live runtime and the
//! deterministic replay path.
//!
//! ### Components:
//! - `state`: owned world state built from validated configuration
//! - `stepper`: the four-phase tick loop
//! - `runtime`: live and deterministic run drivers over the stepper
//! - `diagnostics`: bug report capture for failed replay validations

pub mod diagnostics;
pub mod error;
pub mod runtime;
pub mod state;
pub mod stepper;

pub use error::EngineError;
pub use runtime::{EngineHandle, EngineStatus, SimulationRuntime};
pub use state::SimulationState;
pub use stepper::{Stepper, TickOutcome};
