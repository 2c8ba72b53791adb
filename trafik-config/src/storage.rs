//! Snapshot sink configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Sink selection and retention bounds.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct StorageConfig {
    /// Storage backend (memory).
    #[validate(custom(function = validation::validate_storage_mode))]
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Maximum retained vehicle records; the oldest are evicted first.
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1024, max = 10000000))]
    pub capacity: usize,

    /// Simulated-time retention horizon in seconds.
    #[serde(default = "default_retention_secs")]
    #[validate(range(min = 60, max = 604800))]
    pub retention_secs: u64,
}

fn default_mode() -> String {
    "memory".into()
}

fn default_capacity() -> usize {
    100000
}

fn default_retention_secs() -> u64 {
    3600
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            capacity: default_capacity(),
            retention_secs: default_retention_secs(),
        }
    }
}
