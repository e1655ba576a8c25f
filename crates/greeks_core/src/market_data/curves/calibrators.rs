//! Reference calibrators.
//!
//! Production curve construction (bootstrapping, global fits) lives outside
//! this workspace; these calibrators are deliberately simple but exercise
//! every path the sensitivity engine relies on: quote transforms, dependence
//! on prerequisite curves and non-trivial quote Jacobians.
//!
//! | Calibrator | Ordinate | Prerequisite |
//! |------------|----------|--------------|
//! | [`ZeroRateCalibrator`] | `ln(1 + q)` | none |
//! | [`SpreadCalibrator`] | `base(t) + q` | first prerequisite |
//! | [`HazardRateCalibrator`] | `q / (1 - R(t))` | optional recovery curve |

use super::{CurveHandle, CurveKind, Ordinate};
use crate::traits::{CalibrationInput, Calibrator, QuoteJacobian};
use crate::types::CalibrationError;

/// Annually compounded zero-rate quotes to continuously compounded ordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroRateCalibrator;

impl Calibrator for ZeroRateCalibrator {
    fn name(&self) -> &str {
        "zero-rate"
    }

    fn fit(&self, input: &CalibrationInput<'_>) -> Result<Vec<Ordinate>, CalibrationError> {
        input
            .tenors
            .iter()
            .map(|t| {
                if t.quote() <= -1.0 {
                    return Err(CalibrationError::InvalidQuote {
                        curve: input.curve.to_string(),
                        tenor: t.name().to_string(),
                        quote: t.quote(),
                    });
                }
                Ok(Ordinate::new(t.maturity(), t.quote().ln_1p()))
            })
            .collect()
    }

    fn quote_jacobian(
        &self,
        input: &CalibrationInput<'_>,
        second_order: bool,
    ) -> Result<QuoteJacobian, CalibrationError> {
        let n = input.tenors.len();
        let mut first = vec![vec![0.0; n]; n];
        let mut second = second_order.then(|| vec![vec![vec![0.0; n]; n]; n]);
        for (k, tenor) in input.tenors.iter().enumerate() {
            let growth = 1.0 + tenor.quote();
            first[k][k] = 1.0 / growth;
            if let Some(s) = second.as_mut() {
                s[k][k][k] = -1.0 / (growth * growth);
            }
        }
        Ok(QuoteJacobian::new(first, second))
    }
}

/// Spread over a base curve: `o_k = base(t_k) + q_k`.
///
/// The base is the first prerequisite; this is the `B = A + c` basis
/// relationship.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadCalibrator;

impl SpreadCalibrator {
    fn base<'a>(input: &'a CalibrationInput<'_>) -> Result<&'a CurveHandle, CalibrationError> {
        input
            .prerequisites
            .first()
            .ok_or_else(|| CalibrationError::MissingPrerequisite {
                curve: input.curve.to_string(),
                expected: "base curve".to_string(),
            })
    }
}

impl Calibrator for SpreadCalibrator {
    fn name(&self) -> &str {
        "spread"
    }

    fn fit(&self, input: &CalibrationInput<'_>) -> Result<Vec<Ordinate>, CalibrationError> {
        let base = Self::base(input)?.read();
        input
            .tenors
            .iter()
            .map(|t| Ok(Ordinate::new(t.maturity(), base.value(t.maturity())? + t.quote())))
            .collect()
    }

    fn quote_jacobian(
        &self,
        input: &CalibrationInput<'_>,
        second_order: bool,
    ) -> Result<QuoteJacobian, CalibrationError> {
        Self::base(input)?;
        Ok(QuoteJacobian::identity(input.tenors.len(), second_order))
    }
}

/// Credit spreads to average hazard rates: `h_k = s_k / (1 - R(t_k))`.
///
/// The recovery rate is read from the first prerequisite of kind
/// [`CurveKind::Recovery`], falling back to a fixed rate.
#[derive(Debug, Clone, Copy)]
pub struct HazardRateCalibrator {
    fixed_recovery: f64,
}

impl HazardRateCalibrator {
    /// Market standard senior unsecured recovery.
    pub const DEFAULT_RECOVERY: f64 = 0.4;

    /// Calibrator with a fixed fallback recovery.
    pub fn new(fixed_recovery: f64) -> Self {
        Self { fixed_recovery }
    }

    /// Fallback recovery used without a recovery prerequisite.
    pub fn fixed_recovery(&self) -> f64 {
        self.fixed_recovery
    }
}

impl Default for HazardRateCalibrator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RECOVERY)
    }
}

impl Calibrator for HazardRateCalibrator {
    fn name(&self) -> &str {
        "hazard-rate"
    }

    fn fit(&self, input: &CalibrationInput<'_>) -> Result<Vec<Ordinate>, CalibrationError> {
        let recovery_curve = input
            .prerequisites
            .iter()
            .find(|c| c.kind() == CurveKind::Recovery);

        input
            .tenors
            .iter()
            .map(|t| {
                if t.quote() < 0.0 {
                    return Err(CalibrationError::InvalidQuote {
                        curve: input.curve.to_string(),
                        tenor: t.name().to_string(),
                        quote: t.quote(),
                    });
                }
                let recovery = match recovery_curve {
                    Some(curve) => curve.read().value(t.maturity())?,
                    None => self.fixed_recovery,
                };
                if recovery >= 1.0 {
                    return Err(CalibrationError::FitFailed {
                        curve: input.curve.to_string(),
                        reason: format!("recovery {} leaves no loss at {}", recovery, t.name()),
                    });
                }
                Ok(Ordinate::new(t.maturity(), t.quote() / (1.0 - recovery)))
            })
            .collect()
    }
}
