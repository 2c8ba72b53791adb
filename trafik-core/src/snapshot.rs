//! Per-tick snapshots and the bounded snapshot bus.
//!
//! The stepper publishes one immutable snapshot per tick; analytics and
//! persistence consume them on their own task. The bus is bounded and
//! never blocks the publisher: when the consumer lags, the oldest queued
//! snapshot is displaced and counted, so what the consumer sees is
//! always a monotone subsequence of ticks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::vehicle::{VehicleId, VehicleKind};

/// Snapshot bus error conditions.
#[derive(Error, Debug)]
pub enum BusError {
    #[error("Invalid capacity (must be non-zero)")]
    InvalidCapacity,
}

/// Route-relative and projected view of one vehicle at one tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VehicleState {
    pub id: VehicleId,
    pub kind: VehicleKind,
    pub route_id: String,
    pub progress: f64,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
}

/// Immutable view of every live vehicle at the end of one tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub tick: u64,
    pub timestamp_ns: u64,
    pub vehicles: Vec<VehicleState>,
}

/// Flattened sink row for one vehicle observation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: VehicleId,
    pub kind: VehicleKind,
    pub route_id: String,
    pub progress: f64,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub timestamp_ns: u64,
}

impl VehicleRecord {
    pub fn from_state(state: &VehicleState, timestamp_ns: u64) -> Self {
        Self {
            id: state.id,
            kind: state.kind,
            route_id: state.route_id.clone(),
            progress: state.progress,
            x: state.x,
            y: state.y,
            speed: state.speed,
            timestamp_ns,
        }
    }
}

struct InnerBus {
    queue: ArrayQueue<VehicleSnapshot>,
    dropped: AtomicU64,
    closed: AtomicBool,
}

/// Bounded single-producer single-consumer snapshot bus.
pub struct SnapshotBus {
    inner: Arc<InnerBus>,
}

impl SnapshotBus {
    pub fn with_capacity(capacity: usize) -> Result<Self, BusError> {
        if capacity == 0 {
            return Err(BusError::InvalidCapacity);
        }
        Ok(Self {
            inner: Arc::new(InnerBus {
                queue: ArrayQueue::new(capacity),
                dropped: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Creates a new handle to the shared bus.
    #[inline]
    pub fn share(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Publishes a snapshot. Never blocks: a full queue displaces its
    /// oldest entry, which is counted and logged.
    pub fn publish(&self, snapshot: VehicleSnapshot) {
        if let Some(displaced) = self.inner.queue.force_push(snapshot) {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(tick = displaced.tick, "snapshot displaced by a newer tick");
        }
    }

    /// Takes the oldest queued snapshot, `None` when the queue is empty.
    #[inline]
    pub fn try_recv(&self) -> Option<VehicleSnapshot> {
        self.inner.queue.pop()
    }

    /// Marks the bus closed. Queued snapshots stay receivable, so the
    /// consumer drains before exiting.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Snapshots displaced since creation.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(tick: u64) -> VehicleSnapshot {
        VehicleSnapshot {
            tick,
            timestamp_ns: tick * 1_000_000,
            vehicles: Vec::new(),
        }
    }

    #[test]
    fn rejects_zero_capacity() {
        assert!(matches!(
            SnapshotBus::with_capacity(0),
            Err(BusError::InvalidCapacity)
        ));
    }

    #[test]
    fn handles_single_element() {
        let bus = SnapshotBus::with_capacity(2).unwrap();
        bus.publish(snap(1));
        assert_eq!(bus.try_recv().unwrap().tick, 1);
        assert!(bus.try_recv().is_none());
    }

    #[test]
    fn maintains_ordering() {
        let bus = SnapshotBus::with_capacity(4).unwrap();
        bus.publish(snap(1));
        bus.publish(snap(2));
        assert_eq!(bus.try_recv().unwrap().tick, 1);
        assert_eq!(bus.try_recv().unwrap().tick, 2);
    }

    #[test]
    fn displaces_oldest_when_full() {
        let bus = SnapshotBus::with_capacity(2).unwrap();
        bus.publish(snap(1));
        bus.publish(snap(2));
        bus.publish(snap(3));
        assert_eq!(bus.dropped(), 1);
        assert_eq!(bus.try_recv().unwrap().tick, 2);
        assert_eq!(bus.try_recv().unwrap().tick, 3);
        assert!(bus.try_recv().is_none());
    }

    #[test]
    fn close_leaves_queued_snapshots_receivable() {
        let bus = SnapshotBus::with_capacity(4).unwrap();
        bus.publish(snap(1));
        bus.close();
        assert!(bus.is_closed());
        assert_eq!(bus.try_recv().unwrap().tick, 1);
        assert!(bus.try_recv().is_none());
    }

    #[test]
    fn shared_handles_see_one_queue() {
        let bus = SnapshotBus::with_capacity(4).unwrap();
        let consumer = bus.share();
        bus.publish(snap(7));
        assert_eq!(consumer.try_recv().unwrap().tick, 7);
        consumer.close();
        assert!(bus.is_closed());
    }
}
