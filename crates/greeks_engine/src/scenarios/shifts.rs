//! Concrete scenario shifts.

use super::shift::{SavedCurves, ScenarioContext, ScenarioShift, ShiftOutcome};
use crate::error::{ConfigError, Result, SensitivityError};
use greeks_core::market_data::curves::{CurveHandle, CurveKind};
use greeks_core::traits::{BumpTarget, Pricer};
use greeks_core::types::CalibrationError;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

fn invalid(shift: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidShift {
        shift: shift.to_string(),
        reason: reason.into(),
    }
}

/// Moves the quotes of every matching tenor, then refits the moved curves
/// and everything derived from them.
///
/// Curves are matched by category and by a name pattern supporting a
/// trailing `*` wildcard (`"USD-*"`); `"*"` matches every curve.
///
/// ```
/// use greeks_engine::scenarios::{CurveQuoteShift, ScenarioShift};
///
/// let shift = CurveQuoteShift::rates("usd +50bp", 0.005).on_curves("USD-*");
/// assert!(shift.matches("USD-OIS"));
/// assert!(!shift.matches("EUR-OIS"));
/// assert!(shift.validate().is_ok());
/// ```
#[derive(Debug)]
pub struct CurveQuoteShift {
    name: String,
    targets: BumpTarget,
    pattern: String,
    tenors: Option<BTreeSet<String>>,
    amount: f64,
    relative: bool,
    points: Vec<(CurveHandle, usize)>,
    touched: Vec<CurveHandle>,
    saved: SavedCurves,
}

impl CurveQuoteShift {
    /// Absolute shift of `amount` on every tenor of the targeted curves.
    pub fn new(name: impl Into<String>, targets: BumpTarget, amount: f64) -> Self {
        Self {
            name: name.into(),
            targets,
            pattern: "*".to_string(),
            tenors: None,
            amount,
            relative: false,
            points: Vec::new(),
            touched: Vec::new(),
            saved: SavedCurves::default(),
        }
    }

    /// Discount and projection curve shift.
    pub fn rates(name: impl Into<String>, amount: f64) -> Self {
        Self::new(name, BumpTarget::INTEREST_RATES, amount)
    }

    /// Credit spread shift.
    pub fn credit(name: impl Into<String>, amount: f64) -> Self {
        Self::new(name, BumpTarget::CREDIT_QUOTES, amount)
    }

    /// Recovery rate shift, clipped to `[0, 1]`.
    pub fn recovery(name: impl Into<String>, amount: f64) -> Self {
        Self::new(name, BumpTarget::RECOVERY_RATES, amount)
    }

    /// Correlation shift, clipped to `[-1, 1]`.
    pub fn correlation(name: impl Into<String>, amount: f64) -> Self {
        Self::new(name, BumpTarget::CORRELATIONS, amount)
    }

    /// Restricts the shift to curves matching `pattern`.
    pub fn on_curves(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Restricts the shift to the named tenors.
    pub fn on_tenors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tenors = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Treats the amount as a fraction of each quote.
    pub fn relative(mut self) -> Self {
        self.relative = true;
        self
    }

    /// True when a curve name matches the pattern.
    pub fn matches(&self, curve: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => curve.starts_with(prefix),
            None => self.pattern == curve,
        }
    }

    fn accepts(&self, curve: &CurveHandle) -> bool {
        self.targets.categories().intersects(curve.kind().bump_target()) && self.matches(curve.name())
    }
}

impl ScenarioShift for CurveQuoteShift {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.amount.is_finite() {
            return Err(invalid(&self.name, format!("amount {} is not finite", self.amount)));
        }
        if self.relative && self.amount < -1.0 {
            return Err(invalid(&self.name, "relative shifts below -100% flip the quote sign"));
        }
        if self.targets.categories().is_empty() {
            return Err(invalid(&self.name, "no curve category targeted"));
        }
        Ok(())
    }

    fn save_state(&mut self, context: &ScenarioContext<'_>) -> Result<()> {
        let mut points = Vec::new();
        let mut touched: Vec<CurveHandle> = Vec::new();
        for curve in context.graph().curves().iter().filter(|c| self.accepts(c)) {
            let guard = curve.read();
            let before = points.len();
            for (index, tenor) in guard.tenors().iter().enumerate() {
                let spot_ok = !tenor.convention().is_spot() || self.targets.includes_spot();
                let named = self.tenors.as_ref().map_or(true, |names| names.contains(tenor.name()));
                if spot_ok && named {
                    points.push((curve.clone(), index));
                }
            }
            if points.len() > before {
                touched.push(curve.clone());
            }
        }
        if points.is_empty() {
            return Err(context.error(&self.name, "no tenor matches the shift"));
        }
        self.saved.save(&context.with_dependents(&touched));
        self.points = points;
        self.touched = touched;
        Ok(())
    }

    fn perform_shift(&mut self, context: &ScenarioContext<'_>) -> Result<ShiftOutcome> {
        for (curve, index) in &self.points {
            let mut guard = curve.write();
            let Some(tenor) = guard.tenor(*index) else {
                continue;
            };
            let quote = tenor.quote();
            let target = if self.relative {
                quote * (1.0 + self.amount)
            } else {
                quote + self.amount
            };
            let shifted = tenor.convention().clip(target);
            guard
                .set_quote(*index, shifted)
                .map_err(|err| SensitivityError::Calibration {
                    selection: context.scenario().to_string(),
                    curve: curve.name().to_string(),
                    source: CalibrationError::from(err),
                })?;
        }
        debug!(shift = %self.name, tenors = self.points.len(), curves = self.touched.len(), "quotes shifted");
        Ok(ShiftOutcome::unchanged())
    }

    fn perform_refit(&mut self, context: &ScenarioContext<'_>) -> Result<()> {
        context.refit(&context.with_dependents(&self.touched))
    }

    fn restore_state(&mut self, _context: &ScenarioContext<'_>) {
        self.saved.restore();
        self.points.clear();
        self.touched.clear();
    }
}

/// Marks a credit curve as defaulted at a given time.
///
/// A curve that has already defaulted is left alone.
#[derive(Debug)]
pub struct DefaultEventShift {
    name: String,
    curve: String,
    default_time: f64,
    saved: SavedCurves,
}

impl DefaultEventShift {
    /// Default of `curve` at `default_time` (year fraction).
    pub fn new(name: impl Into<String>, curve: impl Into<String>, default_time: f64) -> Self {
        Self {
            name: name.into(),
            curve: curve.into(),
            default_time,
            saved: SavedCurves::default(),
        }
    }

    fn target<'a>(&self, context: &ScenarioContext<'a>) -> Result<&'a CurveHandle> {
        let curve = context
            .curve(&self.curve)
            .ok_or_else(|| context.error(&self.name, format!("unknown curve '{}'", self.curve)))?;
        if curve.kind() != CurveKind::Credit {
            return Err(context.error(&self.name, format!("'{}' is not a credit curve", self.curve)));
        }
        Ok(curve)
    }
}

impl ScenarioShift for DefaultEventShift {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.default_time.is_finite() || self.default_time < 0.0 {
            return Err(invalid(
                &self.name,
                format!("default time {} must be finite and non-negative", self.default_time),
            ));
        }
        Ok(())
    }

    fn save_state(&mut self, context: &ScenarioContext<'_>) -> Result<()> {
        let curve = self.target(context)?;
        self.saved.save(std::slice::from_ref(curve));
        Ok(())
    }

    fn perform_shift(&mut self, context: &ScenarioContext<'_>) -> Result<ShiftOutcome> {
        let curve = self.target(context)?;
        let mut guard = curve.write();
        if let Some(existing) = guard.default_time() {
            debug!(shift = %self.name, curve = %self.curve, existing, "curve already defaulted");
            return Ok(ShiftOutcome::unchanged());
        }
        guard.set_default_time(Some(self.default_time));
        debug!(shift = %self.name, curve = %self.curve, time = self.default_time, "default triggered");
        Ok(ShiftOutcome::default_changed())
    }

    fn restore_state(&mut self, _context: &ScenarioContext<'_>) {
        self.saved.restore();
    }
}

/// Moves every pricer's valuation time forward by a number of years.
#[derive(Debug)]
pub struct DateRollShift {
    name: String,
    years: f64,
    saved: Vec<(Arc<dyn Pricer>, f64)>,
}

impl DateRollShift {
    /// Roll by `years` (negative rolls back).
    pub fn new(name: impl Into<String>, years: f64) -> Self {
        Self {
            name: name.into(),
            years,
            saved: Vec::new(),
        }
    }
}

impl ScenarioShift for DateRollShift {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.years.is_finite() {
            return Err(invalid(&self.name, format!("roll of {} years is not finite", self.years)));
        }
        Ok(())
    }

    fn save_state(&mut self, context: &ScenarioContext<'_>) -> Result<()> {
        self.saved = context
            .pricers()
            .into_iter()
            .map(|p| {
                let time = p.valuation_time();
                (p, time)
            })
            .collect();
        Ok(())
    }

    fn perform_shift(&mut self, context: &ScenarioContext<'_>) -> Result<ShiftOutcome> {
        for (pricer, time) in &self.saved {
            pricer
                .set_valuation_time(time + self.years)
                .map_err(|err| context.error(&self.name, format!("{}: {}", pricer.name(), err)))?;
        }
        Ok(ShiftOutcome::unchanged())
    }

    fn restore_state(&mut self, _context: &ScenarioContext<'_>) {
        for (pricer, time) in self.saved.drain(..) {
            if let Err(err) = pricer.set_valuation_time(time) {
                warn!(shift = %self.name, pricer = pricer.name(), error = %err, "valuation time not restored");
            }
        }
    }
}

/// Overrides a named contractual term on the pricers carrying it.
#[derive(Debug)]
pub struct TermChangeShift {
    name: String,
    term: String,
    value: f64,
    pricers: Option<BTreeSet<String>>,
    saved: Vec<(Arc<dyn Pricer>, f64)>,
}

impl TermChangeShift {
    /// Sets `term` to `value`.
    pub fn new(name: impl Into<String>, term: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            term: term.into(),
            value,
            pricers: None,
            saved: Vec::new(),
        }
    }

    /// Restricts the change to the named pricers.
    pub fn for_pricers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pricers = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

impl ScenarioShift for TermChangeShift {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.term.trim().is_empty() {
            return Err(invalid(&self.name, "empty term name"));
        }
        if !self.value.is_finite() {
            return Err(invalid(&self.name, format!("value {} is not finite", self.value)));
        }
        Ok(())
    }

    fn save_state(&mut self, context: &ScenarioContext<'_>) -> Result<()> {
        let selected = context
            .pricers()
            .into_iter()
            .filter(|p| self.pricers.as_ref().map_or(true, |names| names.contains(p.name())));
        self.saved = selected
            .filter_map(|p| {
                let current = p.term(&self.term)?;
                Some((p, current))
            })
            .collect();
        if self.saved.is_empty() {
            return Err(context.error(&self.name, format!("no pricer carries term '{}'", self.term)));
        }
        Ok(())
    }

    fn perform_shift(&mut self, context: &ScenarioContext<'_>) -> Result<ShiftOutcome> {
        for (pricer, _) in &self.saved {
            pricer
                .set_term(&self.term, self.value)
                .map_err(|err| context.error(&self.name, format!("{}: {}", pricer.name(), err)))?;
        }
        Ok(ShiftOutcome::unchanged())
    }

    fn restore_state(&mut self, _context: &ScenarioContext<'_>) {
        for (pricer, value) in self.saved.drain(..) {
            if let Err(err) = pricer.set_term(&self.term, value) {
                warn!(shift = %self.name, pricer = pricer.name(), error = %err, "term not restored");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::PricerEvaluator;
    use crate::graph::DependencyGraph;
    use crate::test_support::{basis_curve, curve, flat_curve, TestPricer};
    use greeks_core::market_data::curves::QuoteConvention;
    use greeks_core::traits::Measure;

    fn evaluators(pricers: Vec<TestPricer>) -> Vec<PricerEvaluator> {
        pricers
            .into_iter()
            .map(|p| PricerEvaluator::new(Arc::new(p), Measure::Pv).unwrap())
            .collect()
    }

    fn graph(evaluators: &[PricerEvaluator]) -> DependencyGraph {
        DependencyGraph::from_roots(evaluators.iter().flat_map(PricerEvaluator::curves)).unwrap()
    }

    // ========================================
    // CurveQuoteShift
    // ========================================

    #[test]
    fn test_pattern_matching() {
        let exact = CurveQuoteShift::rates("s", 0.01).on_curves("USD-OIS");
        assert!(exact.matches("USD-OIS"));
        assert!(!exact.matches("USD-OIS-2"));
        let all = CurveQuoteShift::rates("s", 0.01);
        assert!(all.matches("anything"));
    }

    #[test]
    fn test_quote_shift_validation() {
        assert!(CurveQuoteShift::rates("nan", f64::NAN).validate().is_err());
        assert!(CurveQuoteShift::credit("wipe", -1.5).relative().validate().is_err());
        assert!(CurveQuoteShift::credit("halve", -0.5).relative().validate().is_ok());
        assert!(CurveQuoteShift::new("spot", BumpTarget::INCLUDE_SPOT, 0.1).validate().is_err());
    }

    #[test]
    fn test_quote_shift_refits_dependents_and_restores() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0, 5.0], 0.01);
        let basis = basis_curve("3M", &ois, &[1.0, 5.0], 0.001);
        let evs = evaluators(vec![TestPricer::linear("fra", &basis, 1.0)]);
        let graph = graph(&evs);
        let context = ScenarioContext::new("up", &evs, &graph);
        let before = basis.snapshot();

        let mut shift = CurveQuoteShift::rates("ois +10bp", 0.001).on_tenors(["5Y"]);
        shift.save_state(&context).unwrap();
        shift.perform_shift(&context).unwrap();
        shift.perform_refit(&context).unwrap();
        assert!((ois.read().tenors()[1].quote() - 0.011).abs() < 1e-15);
        assert!((basis.read().ordinates()[1].value - 0.012).abs() < 1e-12);
        assert!((basis.read().ordinates()[0].value - 0.011).abs() < 1e-12);

        shift.restore_state(&context);
        assert_eq!(ois.read().tenors()[1].quote(), 0.01);
        assert!(basis.snapshot().same_bits(&before));
    }

    #[test]
    fn test_recovery_shift_clips() {
        let recovery = curve("R", CurveKind::Recovery, &[("5Y", 5.0, 0.9, QuoteConvention::Recovery)]);
        let evs = evaluators(vec![TestPricer::linear("cds", &recovery, 1.0)]);
        let graph = graph(&evs);
        let context = ScenarioContext::new("recovery", &evs, &graph);

        let mut shift = CurveQuoteShift::recovery("r +30%", 0.3);
        shift.save_state(&context).unwrap();
        shift.perform_shift(&context).unwrap();
        assert_eq!(recovery.read().tenors()[0].quote(), 1.0);
        shift.restore_state(&context);
        assert_eq!(recovery.read().tenors()[0].quote(), 0.9);
    }

    #[test]
    fn test_quote_shift_matching_nothing_fails() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let evs = evaluators(vec![TestPricer::linear("swap", &ois, 1.0)]);
        let graph = graph(&evs);
        let context = ScenarioContext::new("credit", &evs, &graph);
        let mut shift = CurveQuoteShift::credit("cds +100bp", 0.01);
        let err = shift.save_state(&context).unwrap_err();
        assert!(matches!(err, SensitivityError::Scenario { .. }));
        // restoring an unsaved shift is harmless
        shift.restore_state(&context);
    }

    // ========================================
    // DefaultEventShift
    // ========================================

    #[test]
    fn test_default_event() {
        let cds = flat_curve("ACME", CurveKind::Credit, &[5.0], 0.02);
        let evs = evaluators(vec![TestPricer::linear("cds", &cds, 1.0)]);
        let graph = graph(&evs);
        let context = ScenarioContext::new("default", &evs, &graph);

        let mut shift = DefaultEventShift::new("acme defaults", "ACME", 0.5);
        shift.save_state(&context).unwrap();
        assert!(shift.perform_shift(&context).unwrap().default_changed);
        assert_eq!(cds.read().default_time(), Some(0.5));

        // A second default on the same name is skipped.
        let mut again = DefaultEventShift::new("again", "ACME", 0.7);
        again.save_state(&context).unwrap();
        assert_eq!(again.perform_shift(&context).unwrap(), ShiftOutcome::unchanged());
        assert_eq!(cds.read().default_time(), Some(0.5));

        again.restore_state(&context);
        shift.restore_state(&context);
        assert_eq!(cds.read().default_time(), None);
    }

    #[test]
    fn test_default_event_rejects_non_credit_curve() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let evs = evaluators(vec![TestPricer::linear("swap", &ois, 1.0)]);
        let graph = graph(&evs);
        let context = ScenarioContext::new("default", &evs, &graph);
        assert!(DefaultEventShift::new("d", "OIS", 1.0).save_state(&context).is_err());
        assert!(DefaultEventShift::new("d", "MISSING", 1.0).save_state(&context).is_err());
        assert!(DefaultEventShift::new("d", "OIS", -1.0).validate().is_err());
    }

    // ========================================
    // DateRollShift and TermChangeShift
    // ========================================

    #[test]
    fn test_date_roll_moves_each_pricer_once() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let pricer = Arc::new(TestPricer::linear("swap", &ois, 1.0).with_measure(Measure::FeePv));
        let dyn_pricer: Arc<dyn Pricer> = pricer.clone();
        let evs = vec![
            PricerEvaluator::new(dyn_pricer.clone(), Measure::Pv).unwrap(),
            PricerEvaluator::new(dyn_pricer, Measure::FeePv).unwrap(),
        ];
        let graph = graph(&evs);
        let context = ScenarioContext::new("roll", &evs, &graph);

        let mut shift = DateRollShift::new("+3M", 0.25);
        shift.save_state(&context).unwrap();
        shift.perform_shift(&context).unwrap();
        assert_eq!(pricer.valuation_time(), 0.25);
        shift.restore_state(&context);
        assert_eq!(pricer.valuation_time(), 0.0);
    }

    #[test]
    fn test_term_change() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let a = Arc::new(TestPricer::linear("a", &ois, 100.0));
        let b = Arc::new(TestPricer::linear("b", &ois, 100.0));
        let evs = vec![
            PricerEvaluator::new(a.clone() as Arc<dyn Pricer>, Measure::Pv).unwrap(),
            PricerEvaluator::new(b.clone() as Arc<dyn Pricer>, Measure::Pv).unwrap(),
        ];
        let graph = graph(&evs);
        let context = ScenarioContext::new("terms", &evs, &graph);

        let mut shift = TermChangeShift::new("wider", "spread", 0.02).for_pricers(["a"]);
        shift.save_state(&context).unwrap();
        shift.perform_shift(&context).unwrap();
        assert_eq!(a.term("spread"), Some(0.02));
        assert_eq!(b.term("spread"), Some(0.0));
        shift.restore_state(&context);
        assert_eq!(a.term("spread"), Some(0.0));

        let mut unknown = TermChangeShift::new("strike", "strike", 1.0);
        assert!(unknown.save_state(&context).is_err());
    }
}
