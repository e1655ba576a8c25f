//! Error types for the greeks demo.

use greeks_core::market_data::MarketDataError;
use greeks_core::types::CalibrationError;
use greeks_engine::error::{ConfigError as EngineConfigError, SensitivityError};
use thiserror::Error;

/// Demo error type
#[derive(Debug, Error)]
pub enum DemoError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Synthetic market construction failed
    #[error("Market construction error: {0}")]
    Market(String),

    /// Sensitivity or scenario run failed
    #[error("Engine error: {0}")]
    Engine(#[from] SensitivityError),

    /// Unknown scenario preset
    #[error("Unknown scenario '{0}'")]
    UnknownScenario(String),

    /// Report serialisation failed
    #[error("Serialisation error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<MarketDataError> for DemoError {
    fn from(err: MarketDataError) -> Self {
        Self::Market(err.to_string())
    }
}

impl From<CalibrationError> for DemoError {
    fn from(err: CalibrationError) -> Self {
        Self::Market(err.to_string())
    }
}

impl From<EngineConfigError> for DemoError {
    fn from(err: EngineConfigError) -> Self {
        Self::Engine(err.into())
    }
}

/// Demo result alias
pub type Result<T> = std::result::Result<T, DemoError>;
