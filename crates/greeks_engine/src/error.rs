//! Error types for sensitivity runs.
//!
//! Configuration errors are detected before any curve is touched. Errors
//! raised mid-run (calibration, pricing) are returned only after every
//! mutated curve has been restored, and carry the selection, curve and
//! pricer needed to locate the failing combination.

use greeks_core::types::{CalibrationError, PricingError};
use thiserror::Error;

/// Invalid inputs, rejected before any mutation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Pricers and per-pricer options have different lengths.
    #[error("{pricers} pricers but {options} {what}")]
    LengthMismatch {
        /// Number of pricers.
        pricers: usize,
        /// Number of options supplied.
        options: usize,
        /// Name of the option array.
        what: &'static str,
    },

    /// The bump style cannot be applied to the target.
    #[error("{bump} bumps are not supported for {target}")]
    UnsupportedBump {
        /// Bump style description.
        bump: String,
        /// Target description.
        target: String,
    },

    /// Curves reference each other in a loop.
    #[error("cyclic curve dependency: {path}")]
    CyclicDependency {
        /// Loop, e.g. `"A -> B -> A"`.
        path: String,
    },

    /// A pricer does not implement the requested measure.
    #[error("pricer '{pricer}' does not support measure '{measure}'")]
    UnknownMeasure {
        /// Pricer name.
        pricer: String,
        /// Measure name.
        measure: String,
    },

    /// Bump magnitudes must be finite and non-negative.
    #[error("invalid {side} bump size {value}: must be finite and non-negative")]
    InvalidBumpSize {
        /// `"up"` or `"down"`.
        side: &'static str,
        /// Offending value.
        value: f64,
    },

    /// No category bit selected.
    #[error("bump targets {0} select no curve category")]
    EmptyTargets(String),

    /// Semi-analytic mode requested for a pricer without ordinate derivatives.
    #[error("pricer '{pricer}' cannot supply ordinate derivatives of '{measure}'")]
    SemiAnalyticUnsupported {
        /// Pricer name.
        pricer: String,
        /// Measure name.
        measure: String,
    },

    /// Invalid shift or scenario parameter.
    #[error("invalid parameter for '{shift}': {reason}")]
    InvalidShift {
        /// Shift name.
        shift: String,
        /// Reason.
        reason: String,
    },

    /// Other invalid configuration value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Sensitivity engine error.
#[derive(Debug, Error)]
pub enum SensitivityError {
    /// Rejected configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A refit failed while a selection was bumped.
    #[error("calibration of curve '{curve}' failed while bumping '{selection}': {source}")]
    Calibration {
        /// Selection being bumped.
        selection: String,
        /// Curve whose refit failed.
        curve: String,
        /// Underlying error.
        #[source]
        source: CalibrationError,
    },

    /// A pricer failed.
    #[error("pricer '{pricer}' failed to evaluate '{measure}' under '{selection}': {source}")]
    Pricing {
        /// Market state label (`"base"`, a selection or a scenario).
        selection: String,
        /// Pricer name.
        pricer: String,
        /// Measure name.
        measure: String,
        /// Underlying error.
        #[source]
        source: PricingError,
    },

    /// A scenario shift failed outside calibration and pricing.
    #[error("scenario '{scenario}' shift '{shift}' failed: {reason}")]
    Scenario {
        /// Scenario name.
        scenario: String,
        /// Shift name.
        shift: String,
        /// Reason.
        reason: String,
    },

    /// A second bump was applied before the first was restored.
    #[error("bump transaction already holds an applied bump for '{selection}'")]
    TransactionOpen {
        /// Selection currently applied.
        selection: String,
    },
}

impl SensitivityError {
    /// True for errors detected before any curve mutation.
    pub fn is_config(&self) -> bool {
        matches!(self, SensitivityError::Config(_))
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, SensitivityError>;
