use super::shift::{ScenarioContext, ScenarioShift};
use crate::error::Result;
use crate::evaluator::{evaluate_batch, PricerEvaluator};
use crate::graph::DependencyGraph;
use crate::parallel::ParallelConfig;
use crate::results::{ScenarioPnl, ScenarioResult};
use tracing::{debug, info};

/// A named, ordered list of shifts applied and unwound as a unit.
#[derive(Debug, Default)]
pub struct Scenario {
    name: String,
    description: String,
    shifts: Vec<Box<dyn ScenarioShift>>,
}

impl Scenario {
    /// Empty scenario.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            shifts: Vec::new(),
        }
    }

    /// Sets a free-text description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a shift.
    pub fn with_shift(mut self, shift: impl ScenarioShift + 'static) -> Self {
        self.shifts.push(Box::new(shift));
        self
    }

    /// Appends a boxed shift.
    pub fn push(&mut self, shift: Box<dyn ScenarioShift>) {
        self.shifts.push(shift);
    }

    /// Scenario name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Shifts in application order.
    pub fn shifts(&self) -> &[Box<dyn ScenarioShift>] {
        &self.shifts
    }

    /// Number of shifts.
    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    /// True when the scenario has no shift.
    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }
}

/// Restores every shift, last first, when dropped.
struct RestoreGuard<'s, 'c> {
    shifts: &'s mut [Box<dyn ScenarioShift>],
    context: &'s ScenarioContext<'c>,
    default_changed: bool,
}

impl Drop for RestoreGuard<'_, '_> {
    fn drop(&mut self) {
        for shift in self.shifts.iter_mut().rev() {
            shift.restore_state(self.context);
        }
        for evaluator in self.context.evaluators() {
            if self.default_changed {
                evaluator.pricer().set_default_changed(false);
            }
            evaluator.reset();
        }
    }
}

/// Runs scenarios against a set of pricers.
///
/// ```text
/// validate all ─► base values ─► save all ─► shift all ─► refit all ─► scenario values
///                                     └────────── restore all, reverse order ◄──────────┘
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScenarioComposer {
    parallel: ParallelConfig,
}

impl ScenarioComposer {
    /// Composer evaluating with `parallel`.
    pub fn new(parallel: ParallelConfig) -> Self {
        Self { parallel }
    }

    /// Applies `scenario`, prices under it and restores the market.
    ///
    /// Shift validation errors are reported before anything is evaluated.
    /// Every shift is restored, in reverse order, whether or not the run
    /// succeeded; pricers are reset afterwards.
    pub fn run(&self, scenario: &mut Scenario, evaluators: &[PricerEvaluator]) -> Result<ScenarioResult> {
        for shift in &scenario.shifts {
            shift.validate()?;
        }
        let graph = DependencyGraph::from_roots(evaluators.iter().flat_map(PricerEvaluator::curves))?;
        let context = ScenarioContext::new(&scenario.name, evaluators, &graph);
        info!(scenario = %scenario.name, shifts = scenario.shifts.len(), pricers = evaluators.len(), "running scenario");

        let all: Vec<&PricerEvaluator> = evaluators.iter().collect();
        let base = evaluate_batch(&all, &self.parallel)
            .map_err(|f| all[f.index].pricing_error("base", f.source))?;

        let mut guard = RestoreGuard {
            shifts: &mut scenario.shifts,
            context: &context,
            default_changed: false,
        };
        for shift in guard.shifts.iter_mut() {
            shift.save_state(&context)?;
        }
        for shift in guard.shifts.iter_mut() {
            let outcome = shift.perform_shift(&context)?;
            debug!(shift = shift.name(), default_changed = outcome.default_changed, "shift applied");
            guard.default_changed |= outcome.default_changed;
        }
        for shift in guard.shifts.iter_mut() {
            shift.perform_refit(&context)?;
        }
        if guard.default_changed {
            for evaluator in evaluators {
                evaluator.pricer().set_default_changed(true);
            }
        }
        let shifted = evaluate_batch(&all, &self.parallel)
            .map_err(|f| all[f.index].pricing_error(context.scenario(), f.source))?;
        drop(guard);

        let mut result = ScenarioResult::new(context.scenario());
        for ((evaluator, base), shifted) in evaluators.iter().zip(base).zip(shifted) {
            result.push(ScenarioPnl::new(evaluator.label(), base, shifted));
        }
        info!(scenario = %result.scenario, pnl = result.total().pnl, "scenario complete");
        Ok(result)
    }

    /// Runs each scenario in turn.
    pub fn run_all(&self, scenarios: &mut [Scenario], evaluators: &[PricerEvaluator]) -> Result<Vec<ScenarioResult>> {
        scenarios.iter_mut().map(|s| self.run(s, evaluators)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, SensitivityError};
    use crate::scenarios::{CurveQuoteShift, DefaultEventShift, ShiftOutcome};
    use crate::test_support::{flat_curve, TestPricer};
    use approx::assert_relative_eq;
    use greeks_core::market_data::curves::CurveKind;
    use greeks_core::traits::{Measure, Pricer};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Shift appending its lifecycle calls to a shared log.
    #[derive(Debug)]
    struct Recorder {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        fail_shift: bool,
    }

    impl Recorder {
        fn new(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                log: log.clone(),
                fail_shift: false,
            }
        }

        fn failing(mut self) -> Self {
            self.fail_shift = true;
            self
        }

        fn record(&self, step: &str) {
            self.log.lock().push(format!("{}:{}", step, self.name));
        }
    }

    impl ScenarioShift for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn save_state(&mut self, _context: &ScenarioContext<'_>) -> Result<()> {
            self.record("save");
            Ok(())
        }

        fn perform_shift(&mut self, context: &ScenarioContext<'_>) -> Result<ShiftOutcome> {
            self.record("shift");
            if self.fail_shift {
                return Err(context.error(&self.name, "asked to fail"));
            }
            Ok(ShiftOutcome::unchanged())
        }

        fn perform_refit(&mut self, _context: &ScenarioContext<'_>) -> Result<()> {
            self.record("refit");
            Ok(())
        }

        fn restore_state(&mut self, _context: &ScenarioContext<'_>) {
            self.record("restore");
        }
    }

    fn evaluator(pricer: &Arc<TestPricer>) -> PricerEvaluator {
        PricerEvaluator::new(pricer.clone() as Arc<dyn Pricer>, Measure::Pv).unwrap()
    }

    // ========================================
    // Lifecycle
    // ========================================

    #[test]
    fn test_lifecycle_order() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let swap = Arc::new(TestPricer::linear("swap", &ois, 1.0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scenario = Scenario::new("ordered")
            .with_shift(Recorder::new("x", &log))
            .with_shift(Recorder::new("y", &log));

        ScenarioComposer::default().run(&mut scenario, &[evaluator(&swap)]).unwrap();
        assert_eq!(
            *log.lock(),
            vec![
                "save:x", "save:y", "shift:x", "shift:y", "refit:x", "refit:y", "restore:y", "restore:x"
            ]
        );
    }

    #[test]
    fn test_failing_shift_restores_in_reverse() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0, 5.0], 0.01);
        let swap = Arc::new(TestPricer::linear("swap", &ois, 1.0));
        let before = ois.snapshot();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scenario = Scenario::new("broken")
            .with_shift(CurveQuoteShift::rates("up", 0.01))
            .with_shift(Recorder::new("x", &log))
            .with_shift(Recorder::new("y", &log).failing());

        let err = ScenarioComposer::default()
            .run(&mut scenario, &[evaluator(&swap)])
            .unwrap_err();
        assert!(matches!(err, SensitivityError::Scenario { ref shift, .. } if shift == "y"));
        assert_eq!(
            *log.lock(),
            vec!["save:x", "save:y", "shift:x", "shift:y", "restore:y", "restore:x"]
        );
        assert!(ois.snapshot().same_bits(&before));
    }

    #[test]
    fn test_invalid_shift_rejected_before_evaluation() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let swap = Arc::new(TestPricer::linear("swap", &ois, 1.0));
        let mut scenario = Scenario::new("bad").with_shift(CurveQuoteShift::rates("nan", f64::NAN));
        let err = ScenarioComposer::default()
            .run(&mut scenario, &[evaluator(&swap)])
            .unwrap_err();
        assert!(matches!(err, SensitivityError::Config(ConfigError::InvalidShift { .. })));
        assert_eq!(swap.evaluations(), 0);
    }

    // ========================================
    // Results
    // ========================================

    #[test]
    fn test_compound_shift_pnl_and_restore() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0, 5.0], 0.01);
        let swap = Arc::new(TestPricer::linear("swap", &ois, 100.0));
        let before = ois.snapshot();
        let mut scenario = Scenario::new("steepener")
            .with_description("short end +10bp, long end +30bp")
            .with_shift(CurveQuoteShift::rates("short", 0.001).on_tenors(["1Y"]))
            .with_shift(CurveQuoteShift::rates("long", 0.003).on_tenors(["5Y"]));

        let result = ScenarioComposer::default()
            .run(&mut scenario, &[evaluator(&swap)])
            .unwrap();
        let pnl = result.pnl_of("swap").unwrap();
        assert_relative_eq!(pnl.base, 2.0, max_relative = 1e-12);
        assert_relative_eq!(pnl.pnl, 0.4, max_relative = 1e-9);
        assert_eq!(result.scenario, "steepener");
        assert!(ois.snapshot().same_bits(&before));
        assert_eq!(swap.resets(), 3);
    }

    #[test]
    fn test_default_changed_propagation() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let cds = flat_curve("ACME", CurveKind::Credit, &[5.0], 0.02);
        let bond = Arc::new(TestPricer::linear("bond", &ois, 1.0));
        let protection = Arc::new(TestPricer::linear("protection", &cds, 1.0));
        let evaluators = [evaluator(&bond), evaluator(&protection)];

        let mut scenario = Scenario::new("jtd").with_shift(DefaultEventShift::new("acme", "ACME", 0.0));
        let result = ScenarioComposer::default().run(&mut scenario, &evaluators).unwrap();

        assert_relative_eq!(result.pnl_of("protection").unwrap().pnl, -0.02, max_relative = 1e-12);
        assert_eq!(result.pnl_of("bond").unwrap().pnl, 0.0);
        assert_eq!(bond.default_changed_history(), vec![true, false]);
        assert_eq!(protection.default_changed_history(), vec![true, false]);
        assert_eq!(cds.read().default_time(), None);
    }

    #[test]
    fn test_run_all() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let swap = Arc::new(TestPricer::linear("swap", &ois, 1.0));
        let mut scenarios = vec![
            Scenario::new("up").with_shift(CurveQuoteShift::rates("up", 0.01)),
            Scenario::new("down").with_shift(CurveQuoteShift::rates("down", -0.01)),
        ];
        let results = ScenarioComposer::new(ParallelConfig::sequential())
            .run_all(&mut scenarios, &[evaluator(&swap)])
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].pnls[0].is_gain());
        assert!(results[1].pnls[0].is_loss());
    }
}
