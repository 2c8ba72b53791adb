// trafik-config/src/validation.rs
//! Custom validation functions for configuration.
//!
//! Provides shared validation logic used across multiple configuration modules.

use std::collections::HashMap;

use validator::ValidationError;

/// Validate storage backend mode.
pub fn validate_storage_mode(mode: &str) -> Result<(), ValidationError> {
    let re =
        regex::Regex::new("^(memory)$").map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(mode) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_storage_mode"))
    }
}

/// Validate that every per-route spawn override is a probability.
pub fn validate_spawn_overrides(overrides: &HashMap<String, f64>) -> Result<(), ValidationError> {
    let valid = overrides
        .values()
        .all(|p| p.is_finite() && (0.0..=1.0).contains(p));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("spawn_override_out_of_range"))
    }
}
