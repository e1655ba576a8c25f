//! Pricer capability interface.
//!
//! The engine never prices anything itself: it asks a [`Pricer`] for a
//! [`Measure`] after perturbing the curves the pricer reads. Measures are a
//! closed enumeration (plus an escape hatch) resolved once when the engine
//! wraps a pricer, instead of being looked up by name on every call.
//!
//! Pricers are shared across threads during the parallel evaluation pass,
//! so any cache they keep must use interior mutability.

use crate::market_data::curves::{CurveHandle, CurveId, CurveKind};
use crate::traits::BumpTarget;
use crate::types::PricingError;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A named quantity a pricer can produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// Present value.
    Pv,
    /// Present value of the fee (premium) leg.
    FeePv,
    /// Present value of the protection leg.
    ProtectionPv,
    /// Expected loss.
    ExpectedLoss,
    /// Break-even spread / par rate.
    BreakEvenSpread,
    /// Pricer-specific measure.
    Custom(String),
}

impl Measure {
    /// Canonical name.
    pub fn name(&self) -> &str {
        match self {
            Measure::Pv => "pv",
            Measure::FeePv => "fee_pv",
            Measure::ProtectionPv => "protection_pv",
            Measure::ExpectedLoss => "expected_loss",
            Measure::BreakEvenSpread => "break_even_spread",
            Measure::Custom(name) => name,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Measure {
    type Err = Infallible;

    /// Known names map to their variant (case-insensitive); anything else is `Custom`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let measure = match s.trim().to_ascii_lowercase().as_str() {
            "pv" | "npv" => Measure::Pv,
            "fee_pv" | "feepv" => Measure::FeePv,
            "protection_pv" | "protectionpv" => Measure::ProtectionPv,
            "expected_loss" | "expectedloss" => Measure::ExpectedLoss,
            "break_even_spread" | "breakevenspread" | "par_rate" => Measure::BreakEvenSpread,
            _ => Measure::Custom(s.trim().to_string()),
        };
        Ok(measure)
    }
}

/// Curves a pricer currently reads, tagged by kind through their handles.
#[derive(Debug, Clone, Default)]
pub struct MarketDependencies {
    curves: Vec<CurveHandle>,
}

impl MarketDependencies {
    /// No dependencies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a curve (ignored when already present).
    pub fn with(mut self, curve: &CurveHandle) -> Self {
        self.push(curve);
        self
    }

    /// Adds a curve (ignored when already present).
    pub fn push(&mut self, curve: &CurveHandle) {
        if !self.contains(curve.id()) {
            self.curves.push(curve.clone());
        }
    }

    /// All curves, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CurveHandle> {
        self.curves.iter()
    }

    /// Curves of one kind.
    pub fn of_kind(&self, kind: CurveKind) -> impl Iterator<Item = &CurveHandle> {
        self.curves.iter().filter(move |c| c.kind() == kind)
    }

    /// Curves whose kind is selected by `targets`.
    pub fn targeted(&self, targets: BumpTarget) -> impl Iterator<Item = &CurveHandle> {
        self.curves
            .iter()
            .filter(move |c| targets.intersects(c.kind().bump_target()))
    }

    /// True when the curve is a direct dependency.
    pub fn contains(&self, id: CurveId) -> bool {
        self.curves.iter().any(|c| c.id() == id)
    }

    /// Number of curves.
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// True when there are no curves.
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

/// Raw derivatives of a measure with respect to one curve's ordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct OrdinateDerivatives {
    /// `∂m/∂o_k` for each ordinate.
    pub gradient: Vec<f64>,
    /// Diagonal `∂²m/∂o_k²`, when available.
    pub curvature: Option<Vec<f64>>,
}

/// A sub-model several pricers reference and cache sensitivities in
/// (e.g. one basket model behind many tranche pricers).
pub trait SharedModel: Send + Sync + fmt::Debug {
    /// Model name.
    fn name(&self) -> &str;

    /// Discards cached state after the market moved.
    fn invalidate(&self);

    /// Populates the cache for the current market.
    fn prepare(&self) -> Result<(), PricingError>;
}

/// Opaque valuation function.
///
/// Only [`name`](Pricer::name), [`supports`](Pricer::supports),
/// [`evaluate`](Pricer::evaluate) and
/// [`market_dependencies`](Pricer::market_dependencies) are required; the
/// remaining methods are optional capabilities with conservative defaults.
pub trait Pricer: Send + Sync + fmt::Debug {
    /// Label used in results and errors.
    fn name(&self) -> &str;

    /// True when `measure` can be evaluated.
    fn supports(&self, measure: &Measure) -> bool;

    /// Evaluates `measure` against the current market.
    fn evaluate(&self, measure: &Measure) -> Result<f64, PricingError>;

    /// Invalidates cached internal state.
    fn reset(&self) {}

    /// Curves the pricer reads directly.
    fn market_dependencies(&self) -> MarketDependencies;

    /// Final maturity, used for hedge tenor resolution.
    fn maturity(&self) -> Option<f64> {
        None
    }

    /// Cached sub-model shared with other pricers.
    fn shared_model(&self) -> Option<Arc<dyn SharedModel>> {
        None
    }

    /// Signals that a default status changed since the last evaluation.
    fn set_default_changed(&self, _changed: bool) {}

    /// Valuation time as a year fraction from the market anchor.
    fn valuation_time(&self) -> f64 {
        0.0
    }

    /// Moves the valuation time (date roll).
    fn set_valuation_time(&self, _time: f64) -> Result<(), PricingError> {
        Err(PricingError::UnsupportedOperation {
            pricer: self.name().to_string(),
            operation: "date roll".to_string(),
        })
    }

    /// Value of a named contractual term (coupon, strike, attachment, ...).
    fn term(&self, _name: &str) -> Option<f64> {
        None
    }

    /// Overrides a named contractual term.
    fn set_term(&self, name: &str, _value: f64) -> Result<(), PricingError> {
        Err(PricingError::UnsupportedOperation {
            pricer: self.name().to_string(),
            operation: format!("term change '{}'", name),
        })
    }

    /// True when [`ordinate_derivatives`](Pricer::ordinate_derivatives) is
    /// implemented for `measure`.
    fn supports_ordinate_derivatives(&self, _measure: &Measure) -> bool {
        false
    }

    /// Derivatives of `measure` with respect to `curve`'s ordinates.
    fn ordinate_derivatives(
        &self,
        measure: &Measure,
        _curve: &CurveHandle,
    ) -> Result<OrdinateDerivatives, PricingError> {
        Err(PricingError::UnsupportedOperation {
            pricer: self.name().to_string(),
            operation: format!("ordinate derivatives of '{}'", measure),
        })
    }
}
