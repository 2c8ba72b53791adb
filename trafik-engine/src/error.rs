use thiserror::Error;
use tokio::task::JoinError;
use trafik_config::ConfigError;
use trafik_core::routes::RouteError;
use trafik_core::snapshot::BusError;
use trafik_core::vehicle::MixError;

/// Error type for simulation runtime operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Route table error: {0}")]
    Route(#[from] RouteError),

    #[error("Vehicle mix error: {0}")]
    Mix(#[from] MixError),

    #[error("Snapshot bus error: {0}")]
    Bus(#[from] BusError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<JoinError> for EngineError {
    fn from(err: JoinError) -> Self {
        EngineError::Processing(err.to_string())
    }
}
