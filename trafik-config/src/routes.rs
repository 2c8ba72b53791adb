//! Route table configuration.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Route table parameters.
///
/// By default the table is generated from `seed`, so route geometry is
/// stable across restarts. A route file takes precedence when set.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct RouteTableConfig {
    /// Number of generated routes.
    #[serde(default = "default_count")]
    #[validate(range(min = 1, max = 64))]
    pub count: usize,

    /// Seed for route generation, independent of the engine seed.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Optional YAML route file; overrides generation when present.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Per-route spawn probability overrides, keyed by route id.
    /// Unknown ids are logged and ignored at engine start.
    #[serde(default)]
    #[validate(custom(function = validation::validate_spawn_overrides))]
    pub spawn_overrides: HashMap<String, f64>,
}

fn default_count() -> usize {
    10
}

fn default_seed() -> u64 {
    7
}

impl Default for RouteTableConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            seed: default_seed(),
            path: None,
            spawn_overrides: HashMap::new(),
        }
    }
}
