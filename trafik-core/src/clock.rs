//! ## trafik-core::clock
//! **Shared simulated clock**
//!
//! One atomic nanosecond counter advanced only by the stepper. Every
//! snapshot and congestion timestamp is read from here, so simulated
//! time is monotone and replays byte-identically under a fixed seed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct SimClock {
    offset: Arc<AtomicU64>, // Nanoseconds
}

impl SimClock {
    pub fn new(epoch_ns: u64) -> Self {
        Self {
            offset: Arc::new(AtomicU64::new(epoch_ns)),
        }
    }

    pub fn now_ns(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }

    pub fn advance(&self, ns: u64) {
        self.offset.fetch_add(ns, Ordering::Release);
    }
}
