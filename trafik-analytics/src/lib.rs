//! # trafik-analytics
//!
//! Congestion detection and traffic statistics over published snapshots.
//!
//! ### Components:
//! - `congestion`: fixed-window density/speed classification per route
//! - `stats`: aggregate speed, per-route and travel-time figures
//!
//! ### Future:
//! - Exponentially weighted windows for trend reporting

pub mod congestion;
pub mod stats;

pub use congestion::{CongestionAnalyzer, CongestionPoint, Severity};
pub use stats::{route_stats, speed_stats, travel_times};
pub use stats::{RouteStats, SpeedStats, SpeedSummary, TravelTimeStats};
