//! Synthetic curves and pricers shared by the unit tests.

use greeks_core::market_data::curves::calibrators::SpreadCalibrator;
use greeks_core::market_data::curves::{
    Curve, CurveHandle, CurveKind, CurveTenor, HedgeInstrument, Ordinate, QuoteConvention,
};
use greeks_core::traits::{
    CalibrationInput, Calibrator, MarketDependencies, Measure, OrdinateDerivatives, Pricer,
    SharedModel,
};
use greeks_core::types::{CalibrationError, PricingError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn convention_for(kind: CurveKind) -> QuoteConvention {
    match kind {
        CurveKind::Credit | CurveKind::Basis => QuoteConvention::Spread,
        CurveKind::Recovery => QuoteConvention::Recovery,
        CurveKind::Correlation => QuoteConvention::Correlation,
        CurveKind::Volatility => QuoteConvention::Volatility,
        CurveKind::Fx | CurveKind::Stock | CurveKind::Commodity => QuoteConvention::Price,
        _ => QuoteConvention::Rate,
    }
}

fn tenors(kind: CurveKind, maturities: &[f64], quote: f64) -> Vec<CurveTenor> {
    maturities
        .iter()
        .map(|&m| {
            CurveTenor::new(format!("{}Y", m), m, quote, convention_for(kind))
                .with_hedge(HedgeInstrument::new(format!("hedge-{}Y", m), m))
        })
        .collect()
}

/// Uncalibrated curve with one tenor per maturity, all at `quote`.
pub(crate) fn flat_curve(name: &str, kind: CurveKind, maturities: &[f64], quote: f64) -> CurveHandle {
    CurveHandle::new(Curve::new(name, kind, tenors(kind, maturities, quote)).unwrap())
}

/// Uncalibrated curve from explicit `(name, maturity, quote, convention)` points.
pub(crate) fn curve(
    name: &str,
    kind: CurveKind,
    points: &[(&str, f64, f64, QuoteConvention)],
) -> CurveHandle {
    let tenors = points
        .iter()
        .map(|&(n, m, q, c)| CurveTenor::new(n, m, q, c))
        .collect();
    CurveHandle::new(Curve::new(name, kind, tenors).unwrap())
}

/// Basis curve `base + spread`, fitted.
pub(crate) fn basis_curve(name: &str, base: &CurveHandle, maturities: &[f64], spread: f64) -> CurveHandle {
    let curve = Curve::new(name, CurveKind::Basis, tenors(CurveKind::Basis, maturities, spread))
        .unwrap()
        .with_calibrator(Arc::new(SpreadCalibrator))
        .with_prerequisite(base.clone())
        .fitted()
        .unwrap();
    CurveHandle::new(curve)
}

/// Calibrator mapping quotes to ordinates that fails above a quote level.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FailingCalibrator {
    pub max_quote: f64,
}

impl Calibrator for FailingCalibrator {
    fn name(&self) -> &str {
        "failing"
    }

    fn fit(&self, input: &CalibrationInput<'_>) -> Result<Vec<Ordinate>, CalibrationError> {
        input
            .tenors
            .iter()
            .map(|t| {
                if t.quote() > self.max_quote {
                    Err(CalibrationError::FitFailed {
                        curve: input.curve.to_string(),
                        reason: format!("quote {} above {}", t.quote(), self.max_quote),
                    })
                } else {
                    Ok(Ordinate::new(t.maturity(), t.quote()))
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Payoff {
    /// `notional * Σ o_k`
    Linear,
    /// `notional * Σ o_k²`
    Quadratic,
    /// `notional * exp(-r(T) (T - t))` on the first curve.
    ZeroCoupon,
}

/// Pricer over the ordinates of its curves, with call counters.
///
/// Defaulted curves contribute nothing. A `spread` term adds
/// `notional * spread` to every payoff.
#[derive(Debug)]
pub(crate) struct TestPricer {
    name: String,
    curves: Vec<CurveHandle>,
    notional: f64,
    payoff: Payoff,
    measures: Vec<Measure>,
    maturity: Option<f64>,
    shared: Option<Arc<dyn SharedModel>>,
    derivatives: bool,
    failing: AtomicBool,
    resets: AtomicUsize,
    evaluations: AtomicUsize,
    default_changed: Mutex<Vec<bool>>,
    valuation_time: Mutex<f64>,
    terms: Mutex<HashMap<String, f64>>,
}

impl TestPricer {
    fn with_payoff(name: impl Into<String>, curve: &CurveHandle, notional: f64, payoff: Payoff) -> Self {
        Self {
            name: name.into(),
            curves: vec![curve.clone()],
            notional,
            payoff,
            measures: vec![Measure::Pv],
            maturity: None,
            shared: None,
            derivatives: false,
            failing: AtomicBool::new(false),
            resets: AtomicUsize::new(0),
            evaluations: AtomicUsize::new(0),
            default_changed: Mutex::new(Vec::new()),
            valuation_time: Mutex::new(0.0),
            terms: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn linear(name: impl Into<String>, curve: &CurveHandle, notional: f64) -> Self {
        Self::with_payoff(name, curve, notional, Payoff::Linear)
    }

    pub(crate) fn quadratic(name: impl Into<String>, curve: &CurveHandle, notional: f64) -> Self {
        Self::with_payoff(name, curve, notional, Payoff::Quadratic)
    }

    pub(crate) fn zero_coupon(name: impl Into<String>, curve: &CurveHandle, notional: f64, maturity: f64) -> Self {
        Self::with_payoff(name, curve, notional, Payoff::ZeroCoupon).with_maturity(maturity)
    }

    pub(crate) fn with_curve(mut self, curve: &CurveHandle) -> Self {
        self.curves.push(curve.clone());
        self
    }

    pub(crate) fn with_measure(mut self, measure: Measure) -> Self {
        self.measures.push(measure);
        self
    }

    pub(crate) fn with_maturity(mut self, maturity: f64) -> Self {
        self.maturity = Some(maturity);
        self
    }

    pub(crate) fn with_shared_model(mut self, model: Arc<dyn SharedModel>) -> Self {
        self.shared = Some(model);
        self
    }

    pub(crate) fn with_ordinate_derivatives(mut self) -> Self {
        self.derivatives = true;
        self
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub(crate) fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub(crate) fn default_changed_history(&self) -> Vec<bool> {
        self.default_changed.lock().clone()
    }

    fn value(&self) -> Result<f64, PricingError> {
        let spread = self.terms.lock().get("spread").copied().unwrap_or(0.0);
        let mut total = self.notional * spread;
        match self.payoff {
            Payoff::Linear | Payoff::Quadratic => {
                for curve in &self.curves {
                    let guard = curve.read();
                    if guard.default_time().is_some() {
                        continue;
                    }
                    total += guard
                        .ordinates()
                        .iter()
                        .map(|o| match self.payoff {
                            Payoff::Quadratic => o.value * o.value,
                            _ => o.value,
                        })
                        .fold(0.0, |acc, v| acc + v)
                        * self.notional;
                }
            }
            Payoff::ZeroCoupon => {
                let maturity = self.maturity.unwrap_or(1.0);
                let tau = (maturity - *self.valuation_time.lock()).max(0.0);
                let rate = self.curves[0].read().value(maturity)?;
                total += self.notional * (-rate * tau).exp();
            }
        }
        Ok(total)
    }
}

impl Pricer for TestPricer {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, measure: &Measure) -> bool {
        self.measures.contains(measure)
    }

    fn evaluate(&self, measure: &Measure) -> Result<f64, PricingError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PricingError::ModelFailure(format!("{} asked to fail", self.name)));
        }
        if !self.supports(measure) {
            return Err(PricingError::UnsupportedMeasure {
                pricer: self.name.clone(),
                measure: measure.to_string(),
            });
        }
        self.value()
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn market_dependencies(&self) -> MarketDependencies {
        let mut deps = MarketDependencies::new();
        for curve in &self.curves {
            deps.push(curve);
        }
        deps
    }

    fn maturity(&self) -> Option<f64> {
        self.maturity
    }

    fn shared_model(&self) -> Option<Arc<dyn SharedModel>> {
        self.shared.clone()
    }

    fn set_default_changed(&self, changed: bool) {
        self.default_changed.lock().push(changed);
    }

    fn valuation_time(&self) -> f64 {
        *self.valuation_time.lock()
    }

    fn set_valuation_time(&self, time: f64) -> Result<(), PricingError> {
        *self.valuation_time.lock() = time;
        Ok(())
    }

    fn term(&self, name: &str) -> Option<f64> {
        self.terms.lock().get(name).copied().or((name == "spread").then_some(0.0))
    }

    fn set_term(&self, name: &str, value: f64) -> Result<(), PricingError> {
        if name != "spread" {
            return Err(PricingError::UnsupportedOperation {
                pricer: self.name.clone(),
                operation: format!("term change '{}'", name),
            });
        }
        self.terms.lock().insert(name.to_string(), value);
        Ok(())
    }

    fn supports_ordinate_derivatives(&self, measure: &Measure) -> bool {
        self.derivatives && self.payoff != Payoff::ZeroCoupon && self.supports(measure)
    }

    fn ordinate_derivatives(
        &self,
        _measure: &Measure,
        curve: &CurveHandle,
    ) -> Result<OrdinateDerivatives, PricingError> {
        let guard = curve.read();
        let ordinates = guard.ordinates();
        if !self.curves.contains(curve) {
            return Ok(OrdinateDerivatives {
                gradient: vec![0.0; ordinates.len()],
                curvature: Some(vec![0.0; ordinates.len()]),
            });
        }
        let (gradient, curvature) = match self.payoff {
            Payoff::Quadratic => (
                ordinates.iter().map(|o| 2.0 * self.notional * o.value).collect(),
                vec![2.0 * self.notional; ordinates.len()],
            ),
            _ => (vec![self.notional; ordinates.len()], vec![0.0; ordinates.len()]),
        };
        Ok(OrdinateDerivatives {
            gradient,
            curvature: Some(curvature),
        })
    }
}

/// Shared model counting its cache rebuilds.
#[derive(Debug)]
pub(crate) struct CountingModel {
    name: String,
    prepares: AtomicUsize,
    invalidations: AtomicUsize,
}

impl CountingModel {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prepares: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub(crate) fn prepares(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }

    pub(crate) fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl SharedModel for CountingModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }

    fn prepare(&self) -> Result<(), PricingError> {
        self.prepares.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
