//! Defines the Sink trait for persisting simulation output.

use async_trait::async_trait;
use thiserror::Error;

use trafik_analytics::CongestionPoint;
use trafik_core::snapshot::VehicleSnapshot;

/// Sink error conditions.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Write side of a snapshot sink.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Persists every vehicle observation in one snapshot.
    async fn write_vehicles(&self, snapshot: &VehicleSnapshot) -> Result<(), SinkError>;

    /// Persists one batch of congestion points.
    async fn write_congestion(&self, points: &[CongestionPoint]) -> Result<(), SinkError>;
}
