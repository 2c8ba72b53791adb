//! # trafik-storage
//!
//! Snapshot persistence behind the `Sink` trait plus the bundled
//! in-memory backend. Write failures are recoverable by contract: the
//! engine logs them and moves on, it never stalls the tick loop on the
//! sink.

pub mod memory;
pub mod sink;

pub use memory::MemoryStore;
pub use sink::{Sink, SinkError};
