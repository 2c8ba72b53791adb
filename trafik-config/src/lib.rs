//! # Trafik Configuration System
//!
//! Hierarchical configuration management for the trafik simulation
//! service. Invalid configuration is fatal at startup; everything that
//! can be checked before the first tick is checked here.
//!
//! ## Features
//! - **Unified Configuration**: Single source of truth across all components
//! - **Validation**: Field and cross-field validation before the engine starts
//! - **Environment Awareness**: `TRAFIK_*` variables override file settings

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod analytics;
mod engine;
mod error;
mod profile;
mod routes;
mod storage;
mod validation;
mod vehicles;

pub use analytics::AnalyticsConfig;
pub use engine::EngineConfig;
pub use error::ConfigError;
pub use profile::TrafficProfileConfig;
pub use routes::RouteTableConfig;
pub use storage::StorageConfig;
pub use vehicles::ClassConfig;
pub use vehicles::VehicleMixConfig;

/// Top-level configuration container for all trafik components.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct TrafikConfig {
    /// Stepper and runtime parameters (tick pacing, caps, probabilities).
    #[validate(nested)]
    pub engine: EngineConfig,

    /// Route table source and per-route overrides.
    #[validate(nested)]
    pub routes: RouteTableConfig,

    /// Vehicle class mix and speed ranges.
    #[validate(nested)]
    pub vehicles: VehicleMixConfig,

    /// Congestion classification thresholds.
    #[validate(nested)]
    pub analytics: AnalyticsConfig,

    /// Snapshot sink selection and retention.
    #[validate(nested)]
    pub storage: StorageConfig,

    /// Daily traffic profile (rush-hour windows).
    #[validate(nested)]
    pub profile: TrafficProfileConfig,
}

impl TrafikConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/trafik.yaml` - Base settings. If missing, defaults are used.
    /// 3. `config/<environment>.yaml` - Environment-specific overrides.
    /// 4. `TRAFIK_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Start with defaults.
        let mut figment = Figment::from(Serialized::defaults(TrafikConfig::default()));

        if Path::new("config/trafik.yaml").exists() {
            figment = figment.merge(Yaml::file("config/trafik.yaml"));
        } else {
            println!("config/trafik.yaml not found, using default configuration");
        }

        let env = std::env::var("TRAFIK_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        figment
            .merge(Env::prefixed("TRAFIK_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                config.cross_validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path for testing/validation.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(
                path.to_string_lossy().to_string(),
            )));
        }

        Figment::from(Serialized::defaults(TrafikConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("TRAFIK_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                config.cross_validate()?;
                Ok(config)
            })
    }

    /// Checks the derive macro cannot express: relations between fields.
    fn cross_validate(&self) -> Result<(), ConfigError> {
        let mut weight_sum = 0.0;
        for (name, class) in [
            ("car", &self.vehicles.car),
            ("truck", &self.vehicles.truck),
            ("bus", &self.vehicles.bus),
            ("motorcycle", &self.vehicles.motorcycle),
        ] {
            if class.speed_min > class.speed_max {
                return Err(ConfigError::Invalid(format!(
                    "vehicles.{}: speed_min ({}) exceeds speed_max ({})",
                    name, class.speed_min, class.speed_max
                )));
            }
            weight_sum += class.weight;
        }
        if weight_sum <= 0.0 {
            return Err(ConfigError::Invalid(
                "vehicles: class weights must sum to more than zero".into(),
            ));
        }

        if self.profile.morning_start >= self.profile.morning_end {
            return Err(ConfigError::Invalid(format!(
                "profile: morning window [{}, {}) is empty",
                self.profile.morning_start, self.profile.morning_end
            )));
        }
        if self.profile.evening_start >= self.profile.evening_end {
            return Err(ConfigError::Invalid(format!(
                "profile: evening window [{}, {}) is empty",
                self.profile.evening_start, self.profile.evening_end
            )));
        }

        Ok(())
    }
}
