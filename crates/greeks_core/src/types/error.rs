//! Error types for structured error handling.
//!
//! This module provides:
//! - `PricingError`: Errors raised by pricer collaborators
//! - `CalibrationError`: Errors raised while refitting a curve from its quotes
//! - `InterpolationError`: Errors from interpolation operations

use crate::market_data::MarketDataError;
use thiserror::Error;

/// Categorised pricing errors.
///
/// Pricers are opaque to the engine; this is the vocabulary they use to
/// report why a measure could not be produced.
///
/// # Examples
/// ```
/// use greeks_core::types::PricingError;
///
/// let err = PricingError::InvalidInput("negative notional".to_string());
/// assert_eq!(format!("{}", err), "Invalid input: negative notional");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    /// Invalid input data or parameters.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Numerical instability during computation.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Model failed to produce a valid result.
    #[error("Model failure: {0}")]
    ModelFailure(String),

    /// The pricer does not implement the requested measure.
    #[error("Pricer '{pricer}' does not support measure '{measure}'")]
    UnsupportedMeasure {
        /// Pricer name.
        pricer: String,
        /// Measure name.
        measure: String,
    },

    /// The pricer does not support an optional capability (date roll, term change, ...).
    #[error("Pricer '{pricer}' does not support {operation}")]
    UnsupportedOperation {
        /// Pricer name.
        pricer: String,
        /// Capability that was requested.
        operation: String,
    },

    /// Market data lookup failed while pricing.
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
}

/// Curve calibration failures.
///
/// Raised by [`Calibrator::fit`](crate::traits::Calibrator::fit) and
/// propagated by [`Curve::refit`](crate::market_data::curves::Curve::refit).
///
/// # Examples
/// ```
/// use greeks_core::types::CalibrationError;
///
/// let err = CalibrationError::MissingPrerequisite {
///     curve: "USD-3M".to_string(),
///     expected: "base curve".to_string(),
/// };
/// assert!(err.to_string().contains("USD-3M"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// The fit itself failed.
    #[error("fit of curve '{curve}' failed: {reason}")]
    FitFailed {
        /// Curve being fitted.
        curve: String,
        /// Failure description.
        reason: String,
    },

    /// A prerequisite curve the calibrator needs is not attached.
    #[error("curve '{curve}' is missing its {expected}")]
    MissingPrerequisite {
        /// Curve being fitted.
        curve: String,
        /// Description of the missing prerequisite.
        expected: String,
    },

    /// A quote is outside the domain the calibrator accepts.
    #[error("curve '{curve}' tenor '{tenor}' has unusable quote {quote}")]
    InvalidQuote {
        /// Curve being fitted.
        curve: String,
        /// Tenor name.
        tenor: String,
        /// Offending quote.
        quote: f64,
    },

    /// Market data lookup failed during the fit.
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
}

/// Interpolation errors.
///
/// # Examples
/// ```
/// use greeks_core::types::InterpolationError;
///
/// let err = InterpolationError::InsufficientData { got: 1, need: 2 };
/// assert_eq!(err.to_string(), "Insufficient data points: got 1, need at least 2");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// Query point outside the interpolation domain.
    #[error("Query point {x} outside valid domain [{min}, {max}]")]
    OutOfBounds {
        /// Query point.
        x: f64,
        /// Domain lower bound.
        min: f64,
        /// Domain upper bound.
        max: f64,
    },

    /// Not enough data points.
    #[error("Insufficient data points: got {got}, need at least {need}")]
    InsufficientData {
        /// Points provided.
        got: usize,
        /// Points required.
        need: usize,
    },

    /// Abscissae are not strictly increasing.
    #[error("Data is not monotonic at index {index}")]
    NonMonotonic {
        /// First index violating the ordering.
        index: usize,
    },

    /// Malformed input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
