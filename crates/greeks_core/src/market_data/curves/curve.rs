//! The quote-bearing curve.

use super::{CurveHandle, CurveId, CurveInterpolation, CurveKind, CurveTenor};
use crate::market_data::MarketDataError;
use crate::math::interpolators::{Interpolator, LinearInterpolator, StepInterpolator};
use crate::traits::{CalibrationInput, Calibrator, QuoteJacobian};
use crate::types::CalibrationError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tolerance used to match an ordinate to a tenor maturity.
const ORDINATE_TIME_TOLERANCE: f64 = 1e-9;

/// A fitted node of a curve's internal representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ordinate {
    /// Time as a year fraction.
    pub time: f64,
    /// Fitted value (zero rate, hazard rate, volatility, ...).
    pub value: f64,
}

impl Ordinate {
    /// Creates an ordinate.
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Everything a bump can change on a curve.
///
/// Restoring a snapshot reproduces the captured state bit-for-bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveState {
    tenors: Vec<CurveTenor>,
    ordinates: Vec<Ordinate>,
    default_time: Option<f64>,
}

impl CurveState {
    /// Tenors at capture time.
    pub fn tenors(&self) -> &[CurveTenor] {
        &self.tenors
    }

    /// Fitted ordinates at capture time.
    pub fn ordinates(&self) -> &[Ordinate] {
        &self.ordinates
    }

    /// Default time at capture time.
    pub fn default_time(&self) -> Option<f64> {
        self.default_time
    }

    /// Bit-level fingerprint of every numeric field.
    ///
    /// Two states with equal fingerprints are indistinguishable, including
    /// signed zeros which `==` would conflate.
    pub fn fingerprint(&self) -> Vec<u64> {
        let mut bits = Vec::with_capacity(self.tenors.len() * 2 + self.ordinates.len() * 2 + 1);
        for tenor in &self.tenors {
            bits.push(tenor.maturity().to_bits());
            bits.push(tenor.quote().to_bits());
        }
        for ordinate in &self.ordinates {
            bits.push(ordinate.time.to_bits());
            bits.push(ordinate.value.to_bits());
        }
        bits.push(self.default_time.map_or(u64::MAX, f64::to_bits));
        bits
    }

    /// True when both states have identical bits.
    pub fn same_bits(&self, other: &CurveState) -> bool {
        self.fingerprint() == other.fingerprint()
    }
}

/// A named, ordered set of tenors with fitted ordinates.
///
/// Without a calibrator, [`refit`](Curve::refit) maps each quote onto an
/// ordinate at the tenor's maturity. With one, the calibrator derives the
/// ordinates from the quotes and from the prerequisite curves.
///
/// # Example
///
/// ```
/// use greeks_core::market_data::curves::{Curve, CurveKind, CurveTenor};
///
/// let mut curve = Curve::new(
///     "EUR-ESTR",
///     CurveKind::Discount,
///     vec![CurveTenor::rate("1Y", 1.0, 0.03), CurveTenor::rate("2Y", 2.0, 0.032)],
/// )
/// .unwrap();
///
/// let before = curve.snapshot();
/// curve.set_quote(0, 0.031).unwrap();
/// curve.refit().unwrap();
/// assert_eq!(curve.ordinates()[0].value, 0.031);
///
/// curve.restore(before.clone());
/// assert!(curve.snapshot().same_bits(&before));
/// ```
#[derive(Debug, Clone)]
pub struct Curve {
    name: String,
    kind: CurveKind,
    tenors: Vec<CurveTenor>,
    interpolation: CurveInterpolation,
    calibrator: Option<Arc<dyn Calibrator>>,
    prerequisites: Vec<CurveHandle>,
    ordinates: Vec<Ordinate>,
    default_time: Option<f64>,
}

impl Curve {
    /// Creates a curve with ordinates mapped straight from the quotes.
    ///
    /// # Errors
    ///
    /// * `MarketDataError::EmptyCurve` - no tenors
    /// * `MarketDataError::DuplicateTenor` - two tenors share a name
    /// * `MarketDataError::UnorderedTenors` - maturities not strictly increasing
    /// * `MarketDataError::InvalidMaturity` / `InvalidQuote` - non-finite inputs
    pub fn new(
        name: impl Into<String>,
        kind: CurveKind,
        tenors: Vec<CurveTenor>,
    ) -> Result<Self, MarketDataError> {
        let name = name.into();
        validate_tenors(&name, &tenors)?;
        let ordinates = direct_ordinates(&tenors);
        Ok(Self {
            name,
            kind,
            tenors,
            interpolation: CurveInterpolation::default(),
            calibrator: None,
            prerequisites: Vec::new(),
            ordinates,
            default_time: None,
        })
    }

    /// Attaches a calibrator. Call [`fitted`](Curve::fitted) or
    /// [`refit`](Curve::refit) afterwards to derive the ordinates from it.
    pub fn with_calibrator(mut self, calibrator: Arc<dyn Calibrator>) -> Self {
        self.calibrator = Some(calibrator);
        self
    }

    /// Declares a prerequisite curve.
    pub fn with_prerequisite(mut self, curve: CurveHandle) -> Self {
        if !self.prerequisites.iter().any(|p| p.id() == curve.id()) {
            self.prerequisites.push(curve);
        }
        self
    }

    /// Sets the interpolation scheme.
    pub fn with_interpolation(mut self, interpolation: CurveInterpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Refits and returns the curve.
    pub fn fitted(mut self) -> Result<Self, CalibrationError> {
        self.refit()?;
        Ok(self)
    }

    /// Curve name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Market category.
    #[inline]
    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    /// Tenors in maturity order.
    #[inline]
    pub fn tenors(&self) -> &[CurveTenor] {
        &self.tenors
    }

    /// Tenor at `index`.
    pub fn tenor(&self, index: usize) -> Option<&CurveTenor> {
        self.tenors.get(index)
    }

    /// Index and tenor with the given name.
    pub fn tenor_by_name(&self, name: &str) -> Option<(usize, &CurveTenor)> {
        self.tenors.iter().enumerate().find(|(_, t)| t.name() == name)
    }

    /// Interpolation scheme.
    #[inline]
    pub fn interpolation(&self) -> CurveInterpolation {
        self.interpolation
    }

    /// True when a calibrator is attached.
    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.calibrator.is_some()
    }

    /// Attached calibrator.
    pub fn calibrator(&self) -> Option<&Arc<dyn Calibrator>> {
        self.calibrator.as_ref()
    }

    /// Curves this curve is derived from.
    #[inline]
    pub fn prerequisites(&self) -> &[CurveHandle] {
        &self.prerequisites
    }

    /// Points prerequisite `id` at `curve` instead, keeping its position.
    /// Returns false when `id` is not a prerequisite.
    pub fn replace_prerequisite(&mut self, id: CurveId, curve: CurveHandle) -> bool {
        match self.prerequisites.iter_mut().find(|p| p.id() == id) {
            Some(slot) => {
                *slot = curve;
                true
            }
            None => false,
        }
    }

    /// Fitted ordinates.
    #[inline]
    pub fn ordinates(&self) -> &[Ordinate] {
        &self.ordinates
    }

    /// Default time of a credit curve, if the name has defaulted.
    #[inline]
    pub fn default_time(&self) -> Option<f64> {
        self.default_time
    }

    /// Marks (or clears) a default event.
    pub fn set_default_time(&mut self, time: Option<f64>) {
        self.default_time = time;
    }

    /// Overwrites the quote of tenor `index`. Ordinates are untouched until
    /// the next [`refit`](Curve::refit).
    pub fn set_quote(&mut self, index: usize, quote: f64) -> Result<(), MarketDataError> {
        if !quote.is_finite() {
            let tenor = self
                .tenors
                .get(index)
                .map(|t| t.name().to_string())
                .unwrap_or_default();
            return Err(MarketDataError::InvalidQuote {
                curve: self.name.clone(),
                tenor,
            });
        }
        let tenor = self
            .tenors
            .get_mut(index)
            .ok_or_else(|| MarketDataError::TenorIndexOutOfRange {
                curve: self.name.clone(),
                index,
            })?;
        tenor.set_quote(quote);
        Ok(())
    }

    /// Adds `amount` to the ordinate sitting at `time`, without refitting.
    pub fn shift_ordinate(&mut self, time: f64, amount: f64) -> Result<(), MarketDataError> {
        let ordinate = self
            .ordinates
            .iter_mut()
            .find(|o| (o.time - time).abs() <= ORDINATE_TIME_TOLERANCE)
            .ok_or_else(|| MarketDataError::UnknownOrdinate {
                curve: self.name.clone(),
                time,
            })?;
        ordinate.value += amount;
        Ok(())
    }

    /// Re-derives the ordinates from the current quotes.
    ///
    /// # Errors
    ///
    /// Whatever the calibrator reports. On error the ordinates are left as
    /// they were before the call.
    pub fn refit(&mut self) -> Result<(), CalibrationError> {
        let ordinates = match &self.calibrator {
            Some(calibrator) => calibrator.fit(&CalibrationInput {
                curve: &self.name,
                tenors: &self.tenors,
                prerequisites: &self.prerequisites,
            })?,
            None => direct_ordinates(&self.tenors),
        };
        if ordinates.is_empty() {
            return Err(CalibrationError::FitFailed {
                curve: self.name.clone(),
                reason: "calibrator produced no ordinates".to_string(),
            });
        }
        self.ordinates = ordinates;
        Ok(())
    }

    /// Jacobian of the ordinates with respect to this curve's quotes.
    ///
    /// Curves without a calibrator carry their quotes as ordinates, so the
    /// Jacobian is the identity.
    pub fn quote_jacobian(&self, second_order: bool) -> Result<QuoteJacobian, CalibrationError> {
        match &self.calibrator {
            Some(calibrator) => calibrator.quote_jacobian(
                &CalibrationInput {
                    curve: &self.name,
                    tenors: &self.tenors,
                    prerequisites: &self.prerequisites,
                },
                second_order,
            ),
            None => Ok(QuoteJacobian::identity(self.tenors.len(), second_order)),
        }
    }

    /// Captures the bump-relevant state.
    pub fn snapshot(&self) -> CurveState {
        CurveState {
            tenors: self.tenors.clone(),
            ordinates: self.ordinates.clone(),
            default_time: self.default_time,
        }
    }

    /// Reinstates a state captured by [`snapshot`](Curve::snapshot).
    pub fn restore(&mut self, state: CurveState) {
        self.tenors = state.tenors;
        self.ordinates = state.ordinates;
        self.default_time = state.default_time;
    }

    /// Interpolated ordinate value at `t`, flat beyond the first and last knot.
    pub fn value(&self, t: f64) -> Result<f64, MarketDataError> {
        let first = self.ordinates.first().ok_or_else(|| MarketDataError::NotFitted {
            curve: self.name.clone(),
        })?;
        if self.ordinates.len() == 1 {
            return Ok(first.value);
        }

        let xs: Vec<f64> = self.ordinates.iter().map(|o| o.time).collect();
        let ys: Vec<f64> = self.ordinates.iter().map(|o| o.value).collect();

        match self.interpolation {
            CurveInterpolation::Linear => {
                Ok(LinearInterpolator::new(&xs, &ys)?.interpolate_flat(t))
            }
            CurveInterpolation::Step => Ok(StepInterpolator::new(&xs, &ys)?.interpolate_flat(t)),
            CurveInterpolation::RateTime => {
                if t <= first.time {
                    return Ok(first.value);
                }
                let rt: Vec<f64> = self.ordinates.iter().map(|o| o.value * o.time).collect();
                let interp = LinearInterpolator::new(&xs, &rt)?;
                let (_, hi) = interp.domain();
                if t >= hi {
                    return Ok(ys[ys.len() - 1]);
                }
                Ok(interp.interpolate(t)? / t)
            }
        }
    }
}

fn direct_ordinates(tenors: &[CurveTenor]) -> Vec<Ordinate> {
    tenors
        .iter()
        .map(|t| Ordinate::new(t.maturity(), t.quote()))
        .collect()
}

fn validate_tenors(curve: &str, tenors: &[CurveTenor]) -> Result<(), MarketDataError> {
    if tenors.is_empty() {
        return Err(MarketDataError::EmptyCurve {
            curve: curve.to_string(),
        });
    }
    for (i, tenor) in tenors.iter().enumerate() {
        if !tenor.maturity().is_finite() || tenor.maturity() < 0.0 {
            return Err(MarketDataError::InvalidMaturity {
                curve: curve.to_string(),
                tenor: tenor.name().to_string(),
                maturity: tenor.maturity(),
            });
        }
        if !tenor.quote().is_finite() {
            return Err(MarketDataError::InvalidQuote {
                curve: curve.to_string(),
                tenor: tenor.name().to_string(),
            });
        }
        if tenors[..i].iter().any(|t| t.name() == tenor.name()) {
            return Err(MarketDataError::DuplicateTenor {
                curve: curve.to_string(),
                tenor: tenor.name().to_string(),
            });
        }
        if i > 0 && tenor.maturity() <= tenors[i - 1].maturity() {
            return Err(MarketDataError::UnorderedTenors {
                curve: curve.to_string(),
                tenor: tenor.name().to_string(),
            });
        }
    }
    Ok(())
}
