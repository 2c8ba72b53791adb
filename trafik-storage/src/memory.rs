//! In-memory sink with bounded capacity and retention pruning.
//!
//! Records live in insertion order, which is timestamp order because
//! both the live path and backfill write chronologically. Reads return
//! newest-first and never mutate, so repeated reads with no writes in
//! between are identical.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use trafik_analytics::CongestionPoint;
use trafik_config::StorageConfig;
use trafik_core::snapshot::{VehicleRecord, VehicleSnapshot};

use crate::sink::{Sink, SinkError};

pub struct MemoryStore {
    vehicles: RwLock<VecDeque<VehicleRecord>>,
    congestion: RwLock<VecDeque<CongestionPoint>>,
    capacity: usize,
    retention_ns: u64,
}

impl MemoryStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            vehicles: RwLock::new(VecDeque::new()),
            congestion: RwLock::new(VecDeque::new()),
            capacity: config.capacity,
            retention_ns: config.retention_secs.saturating_mul(1_000_000_000),
        }
    }

    /// Newest-first vehicle records, at most `limit`.
    pub fn recent_vehicles(&self, limit: usize) -> Vec<VehicleRecord> {
        self.vehicles
            .read()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Newest-first congestion points observed at or after `since_ns`.
    pub fn recent_congestion(&self, since_ns: u64) -> Vec<CongestionPoint> {
        self.congestion
            .read()
            .iter()
            .rev()
            .take_while(|p| p.timestamp_ns >= since_ns)
            .cloned()
            .collect()
    }

    /// Drops everything older than the retention horizon ending at
    /// `now_ns`. Returns the number of removed entries.
    pub fn prune_before(&self, now_ns: u64) -> usize {
        let cutoff = now_ns.saturating_sub(self.retention_ns);
        let mut removed = 0;
        {
            let mut records = self.vehicles.write();
            while records.front().is_some_and(|r| r.timestamp_ns < cutoff) {
                records.pop_front();
                removed += 1;
            }
        }
        {
            let mut points = self.congestion.write();
            while points.front().is_some_and(|p| p.timestamp_ns < cutoff) {
                points.pop_front();
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "pruned entries past the retention horizon");
        }
        removed
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.read().len()
    }

    pub fn congestion_count(&self) -> usize {
        self.congestion.read().len()
    }
}

#[async_trait]
impl Sink for MemoryStore {
    async fn write_vehicles(&self, snapshot: &VehicleSnapshot) -> Result<(), SinkError> {
        let mut records = self.vehicles.write();
        for state in &snapshot.vehicles {
            if records.len() == self.capacity {
                records.pop_front();
            }
            records.push_back(VehicleRecord::from_state(state, snapshot.timestamp_ns));
        }
        Ok(())
    }

    async fn write_congestion(&self, points: &[CongestionPoint]) -> Result<(), SinkError> {
        let mut stored = self.congestion.write();
        for point in points {
            if stored.len() == self.capacity {
                stored.pop_front();
            }
            stored.push_back(point.clone());
        }
        Ok(())
    }
}
