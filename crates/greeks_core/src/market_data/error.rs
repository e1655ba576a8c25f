//! Market data error types.

use crate::types::InterpolationError;
use thiserror::Error;

/// Errors for curve construction, mutation and lookup.
///
/// # Examples
/// ```
/// use greeks_core::market_data::MarketDataError;
///
/// let err = MarketDataError::DuplicateTenor {
///     curve: "USD-OIS".to_string(),
///     tenor: "5Y".to_string(),
/// };
/// assert_eq!(err.to_string(), "curve 'USD-OIS' has duplicate tenor '5Y'");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// A curve was built without tenors.
    #[error("curve '{curve}' has no tenors")]
    EmptyCurve {
        /// Curve name.
        curve: String,
    },

    /// Two tenors share a name.
    #[error("curve '{curve}' has duplicate tenor '{tenor}'")]
    DuplicateTenor {
        /// Curve name.
        curve: String,
        /// Duplicated tenor name.
        tenor: String,
    },

    /// Tenors are not strictly increasing in maturity.
    #[error("curve '{curve}' tenor '{tenor}' is out of maturity order")]
    UnorderedTenors {
        /// Curve name.
        curve: String,
        /// First tenor breaking the order.
        tenor: String,
    },

    /// Negative or non-finite maturity.
    #[error("curve '{curve}' tenor '{tenor}' has invalid maturity {maturity}")]
    InvalidMaturity {
        /// Curve name.
        curve: String,
        /// Tenor name.
        tenor: String,
        /// Offending maturity.
        maturity: f64,
    },

    /// Non-finite quote.
    #[error("curve '{curve}' tenor '{tenor}' has non-finite quote")]
    InvalidQuote {
        /// Curve name.
        curve: String,
        /// Tenor name.
        tenor: String,
    },

    /// Time argument outside the valid range.
    #[error("invalid time argument {time}")]
    InvalidTime {
        /// Offending time.
        time: f64,
    },

    /// Tenor index outside the curve.
    #[error("curve '{curve}' has no tenor at index {index}")]
    TenorIndexOutOfRange {
        /// Curve name.
        curve: String,
        /// Requested index.
        index: usize,
    },

    /// No ordinate sits at the requested time.
    #[error("curve '{curve}' has no ordinate at t = {time}")]
    UnknownOrdinate {
        /// Curve name.
        curve: String,
        /// Requested time.
        time: f64,
    },

    /// Curve has no fitted ordinates.
    #[error("curve '{curve}' has no fitted ordinates")]
    NotFitted {
        /// Curve name.
        curve: String,
    },

    /// Interpolation failure.
    #[error("interpolation failed: {0}")]
    Interpolation(#[from] InterpolationError),
}
