//! Curve categories and interpolation schemes.

use crate::traits::BumpTarget;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market category of a curve or surface.
///
/// The category decides which [`BumpTarget`] bit selects the curve's tenors
/// and how dependent curves are treated by the bump transaction (credit and
/// correlation dependents are only refit on request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    /// Discounting curve (OIS, collateral).
    Discount,
    /// Forward/projection curve for a floating index.
    Projection,
    /// Basis curve defined as a spread over another rate curve.
    Basis,
    /// FX forward points or spot.
    Fx,
    /// Credit spread / hazard curve.
    Credit,
    /// Recovery rate term structure.
    Recovery,
    /// Inflation index curve.
    Inflation,
    /// Commodity forward curve.
    Commodity,
    /// Equity price / dividend curve.
    Stock,
    /// Volatility curve or surface.
    Volatility,
    /// Correlation term structure.
    Correlation,
}

impl CurveKind {
    /// All kinds, in declaration order.
    pub const ALL: [CurveKind; 11] = [
        CurveKind::Discount,
        CurveKind::Projection,
        CurveKind::Basis,
        CurveKind::Fx,
        CurveKind::Credit,
        CurveKind::Recovery,
        CurveKind::Inflation,
        CurveKind::Commodity,
        CurveKind::Stock,
        CurveKind::Volatility,
        CurveKind::Correlation,
    ];

    /// The bump target bit that selects this kind of curve.
    pub fn bump_target(self) -> BumpTarget {
        match self {
            CurveKind::Discount | CurveKind::Projection => BumpTarget::INTEREST_RATES,
            CurveKind::Basis => BumpTarget::INTEREST_RATE_BASIS,
            CurveKind::Fx => BumpTarget::FX_RATES,
            CurveKind::Credit => BumpTarget::CREDIT_QUOTES,
            CurveKind::Recovery => BumpTarget::RECOVERY_RATES,
            CurveKind::Inflation => BumpTarget::INFLATION_RATES,
            CurveKind::Commodity => BumpTarget::COMMODITY_PRICE,
            CurveKind::Stock => BumpTarget::STOCK_PRICE,
            CurveKind::Volatility => BumpTarget::VOLATILITIES,
            CurveKind::Correlation => BumpTarget::CORRELATIONS,
        }
    }

    /// Human readable category label used in result rows.
    pub fn label(self) -> &'static str {
        match self {
            CurveKind::Discount => "Discount",
            CurveKind::Projection => "Projection",
            CurveKind::Basis => "Basis",
            CurveKind::Fx => "FX",
            CurveKind::Credit => "Credit",
            CurveKind::Recovery => "Recovery",
            CurveKind::Inflation => "Inflation",
            CurveKind::Commodity => "Commodity",
            CurveKind::Stock => "Stock",
            CurveKind::Volatility => "Volatility",
            CurveKind::Correlation => "Correlation",
        }
    }

    /// True for curves whose ordinates are continuously compounded rates.
    pub fn is_rate_curve(self) -> bool {
        matches!(
            self,
            CurveKind::Discount | CurveKind::Projection | CurveKind::Basis | CurveKind::Inflation
        )
    }
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Interpolation scheme applied to a curve's fitted ordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveInterpolation {
    /// Linear in the ordinate value.
    #[default]
    Linear,
    /// Linear in `value * t` (log-linear discount factors for zero-rate ordinates).
    RateTime,
    /// Piecewise constant, each ordinate holding back to the previous knot.
    Step,
}
