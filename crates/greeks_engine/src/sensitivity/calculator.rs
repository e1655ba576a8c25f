use super::hedge::{resolve_hedge, HedgePricerFactory};
use super::semi_analytic::SemiAnalyticCalculator;
use crate::bump::BumpTransaction;
use crate::config::{BumpFlags, SensitivityConfig, SensitivityMethod};
use crate::error::Result;
use crate::evaluator::{evaluate_batch, PricerEvaluator};
use crate::graph::DependencyGraph;
use crate::results::{ResultRow, ResultTable};
use crate::selection::{TenorFilter, TenorSelection};
use greeks_core::traits::{Measure, Pricer};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Label of the unbumped market in error context.
const BASE: &str = "base";

/// Hedge deltas at or below this magnitude give a zero hedge notional.
pub const HEDGE_DELTA_EPSILON: f64 = 1e-10;

/// Finite-difference (bump and reprice) sensitivity calculator.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use greeks_core::market_data::curves::{Curve, CurveHandle, CurveKind, CurveTenor};
/// use greeks_core::traits::{MarketDependencies, Measure, Pricer};
/// use greeks_core::types::PricingError;
/// use greeks_engine::config::SensitivityConfig;
/// use greeks_engine::sensitivity::SensitivityCalculator;
///
/// #[derive(Debug)]
/// struct ZeroBond {
///     curve: CurveHandle,
/// }
///
/// impl Pricer for ZeroBond {
///     fn name(&self) -> &str {
///         "zero-5y"
///     }
///     fn supports(&self, measure: &Measure) -> bool {
///         *measure == Measure::Pv
///     }
///     fn evaluate(&self, _measure: &Measure) -> Result<f64, PricingError> {
///         let r = self.curve.read().value(5.0)?;
///         Ok(100.0 * (-5.0 * r).exp())
///     }
///     fn market_dependencies(&self) -> MarketDependencies {
///         MarketDependencies::new().with(&self.curve)
///     }
/// }
///
/// let curve = CurveHandle::new(
///     Curve::new(
///         "USD-OIS",
///         CurveKind::Discount,
///         vec![CurveTenor::rate("1Y", 1.0, 0.01), CurveTenor::rate("5Y", 5.0, 0.02)],
///     )
///     .unwrap(),
/// );
/// let pricer: Arc<dyn Pricer> = Arc::new(ZeroBond { curve: curve.clone() });
///
/// let table = SensitivityCalculator::new(SensitivityConfig::default())
///     .compute(&[pricer], &[Measure::Pv])
///     .unwrap();
///
/// assert_eq!(table.len(), 2);
/// let five_year = table.find("USD-OIS", "5Y", "zero-5y").unwrap();
/// assert!(five_year.delta < 0.0);
/// assert_eq!(curve.read().tenors()[1].quote(), 0.02);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SensitivityCalculator {
    config: SensitivityConfig,
}

#[derive(Debug)]
struct Leg {
    values: Vec<f64>,
    width: f64,
}

#[derive(Debug)]
struct HedgeSlot {
    tenor: String,
    index: usize,
}

#[derive(Debug, Default)]
struct HedgePlan {
    evaluators: Vec<PricerEvaluator>,
    keys: Vec<(String, Measure)>,
    slots: Vec<Option<HedgeSlot>>,
}

impl SensitivityCalculator {
    /// Calculator for `config`.
    pub fn new(config: SensitivityConfig) -> Self {
        Self { config }
    }

    /// Run configuration.
    pub fn config(&self) -> &SensitivityConfig {
        &self.config
    }

    /// Sensitivities of each pricer's measure, `measures[i]` belonging to `pricers[i]`.
    ///
    /// # Errors
    ///
    /// Configuration errors before any curve is touched; calibration and
    /// pricing errors after the curves have been restored.
    pub fn compute(&self, pricers: &[Arc<dyn Pricer>], measures: &[Measure]) -> Result<ResultTable> {
        self.config.validate()?;
        let evaluators = PricerEvaluator::from_pairs(pricers, measures, self.config.allow_missing)?;
        self.compute_evaluators(&evaluators, None)
    }

    /// Like [`compute`](Self::compute), with hedge ratios priced through `hedges`.
    pub fn compute_with_hedges(
        &self,
        pricers: &[Arc<dyn Pricer>],
        measures: &[Measure],
        hedges: &dyn HedgePricerFactory,
    ) -> Result<ResultTable> {
        self.config.validate()?;
        let evaluators = PricerEvaluator::from_pairs(pricers, measures, self.config.allow_missing)?;
        self.compute_evaluators(&evaluators, Some(hedges))
    }

    /// Sensitivities for prepared evaluators.
    ///
    /// Every pricer is reset once more at the end so that cached state
    /// reflects the restored market.
    pub fn compute_evaluators(
        &self,
        evaluators: &[PricerEvaluator],
        hedges: Option<&dyn HedgePricerFactory>,
    ) -> Result<ResultTable> {
        self.config.validate()?;
        let outcome = match self.config.method {
            SensitivityMethod::FiniteDifference => self.finite_difference(evaluators, hedges),
            SensitivityMethod::SemiAnalytic => SemiAnalyticCalculator::new(&self.config).compute(evaluators),
        };
        for evaluator in evaluators {
            evaluator.reset();
        }
        outcome
    }

    fn finite_difference(
        &self,
        evaluators: &[PricerEvaluator],
        hedges: Option<&dyn HedgePricerFactory>,
    ) -> Result<ResultTable> {
        let graph = DependencyGraph::build(evaluators, self.config.targets)?;
        let selections = self
            .config
            .bump_type
            .select(&graph, &TenorFilter::from_config(&self.config));
        info!(
            evaluators = evaluators.len(),
            curves = graph.len(),
            selections = selections.len(),
            bump_type = %self.config.bump_type,
            "computing sensitivities"
        );

        let mut table = ResultTable::new();
        if evaluators.is_empty() || selections.is_empty() {
            return Ok(table);
        }

        let all: Vec<&PricerEvaluator> = evaluators.iter().collect();
        let base = evaluate_batch(&all, &self.config.parallel)
            .map_err(|f| all[f.index].pricing_error(BASE, f.source))?;

        for selection in &selections {
            let affected: Vec<usize> = evaluators
                .iter()
                .enumerate()
                .filter(|(_, e)| selection.is_uniform() || e.depends_on_any(selection.curves()))
                .map(|(i, _)| i)
                .collect();
            if affected.is_empty() {
                debug!(selection = selection.name(), "no pricer depends on selection");
                continue;
            }

            let plan = self.hedge_plan(selection, &affected, evaluators, hedges);
            let hedge_refs: Vec<&PricerEvaluator> = plan.evaluators.iter().collect();
            let hedge_base = evaluate_batch(&hedge_refs, &self.config.parallel)
                .map_err(|f| hedge_refs[f.index].pricing_error(BASE, f.source))?;

            let batch: Vec<&PricerEvaluator> = affected
                .iter()
                .map(|&i| &evaluators[i])
                .chain(plan.evaluators.iter())
                .collect();
            debug!(
                selection = selection.name(),
                tenors = selection.tenors().len(),
                pricers = affected.len(),
                hedges = plan.evaluators.len(),
                "bumping selection"
            );
            let up = self.leg(&graph, selection, self.config.up, self.config.flags, &batch)?;
            let down = self.leg(
                &graph,
                selection,
                self.config.down,
                self.config.flags | BumpFlags::BUMP_DOWN,
                &batch,
            )?;
            for hedge in &plan.evaluators {
                hedge.reset();
            }

            let width = up.as_ref().map_or(0.0, |l| l.width) + down.as_ref().map_or(0.0, |l| l.width);
            let leg_value = |leg: &Option<Leg>, slot: usize, fallback: f64| {
                leg.as_ref().map_or(fallback, |l| l.values[slot])
            };

            for (slot, &index) in affected.iter().enumerate() {
                let b = base[index];
                let u = leg_value(&up, slot, b);
                let d = leg_value(&down, slot, b);
                let delta = self.scaled(u - d, width);

                let mut row = ResultRow::new(
                    self.category(selection),
                    selection.element(),
                    selection.tenor_label(),
                    evaluators[index].label(),
                    delta,
                );
                if self.config.calc_gamma {
                    let raw = u - 2.0 * b + d;
                    let gamma = match (self.config.scale_delta, width > 0.0) {
                        (false, _) => raw,
                        (true, true) => raw / (width / 2.0),
                        (true, false) => 0.0,
                    };
                    row = row.with_gamma(gamma);
                }
                if self.config.calc_hedge {
                    row = match &plan.slots[slot] {
                        Some(hedge) => {
                            let hb = hedge_base[hedge.index];
                            let hu = leg_value(&up, affected.len() + hedge.index, hb);
                            let hd = leg_value(&down, affected.len() + hedge.index, hb);
                            let hedge_delta = self.scaled(hu - hd, width);
                            let notional = if hedge_delta.abs() > HEDGE_DELTA_EPSILON {
                                delta / hedge_delta
                            } else {
                                0.0
                            };
                            row.with_hedge(hedge.tenor.clone(), hedge_delta, notional)
                        }
                        None => row.with_hedge(String::new(), 0.0, 0.0),
                    };
                }
                table.push(row);
            }
        }

        info!(rows = table.len(), "sensitivities computed");
        Ok(table)
    }

    /// Applies one bump leg, evaluates the batch under it and restores.
    ///
    /// `None` when the leg was not requested or moved nothing.
    fn leg(
        &self,
        graph: &DependencyGraph,
        selection: &TenorSelection,
        amount: f64,
        flags: BumpFlags,
        batch: &[&PricerEvaluator],
    ) -> Result<Option<Leg>> {
        if amount == 0.0 {
            return Ok(None);
        }
        let mut transaction = BumpTransaction::new(graph);
        let Some(bump) = transaction.apply(selection, amount, flags)? else {
            warn!(selection = selection.name(), amount, %flags, "bump moved no quote, leg skipped");
            return Ok(None);
        };
        let values = evaluate_batch(batch, &self.config.parallel);
        transaction.restore();
        let values = values.map_err(|f| batch[f.index].pricing_error(selection.name(), f.source))?;
        Ok(Some(Leg {
            values,
            width: bump.realized().abs(),
        }))
    }

    fn hedge_plan(
        &self,
        selection: &TenorSelection,
        affected: &[usize],
        evaluators: &[PricerEvaluator],
        factory: Option<&dyn HedgePricerFactory>,
    ) -> HedgePlan {
        let mut plan = HedgePlan::default();
        let Some(factory) = factory.filter(|_| self.config.calc_hedge) else {
            plan.slots = affected.iter().map(|_| None).collect();
            return plan;
        };

        for &index in affected {
            let evaluator = &evaluators[index];
            let choice = resolve_hedge(
                &self.config.hedge_tenor,
                selection,
                evaluator.pricer().maturity(),
                self.config.flags,
            );
            let Some(choice) = choice else {
                warn!(selection = selection.name(), pricer = evaluator.label(), rule = %self.config.hedge_tenor, "no hedge tenor matched");
                plan.slots.push(None);
                continue;
            };

            let key = (choice.instrument.id.clone(), evaluator.measure().clone());
            if let Some(existing) = plan.keys.iter().position(|k| *k == key) {
                plan.slots.push(Some(HedgeSlot {
                    tenor: choice.tenor,
                    index: existing,
                }));
                continue;
            }

            let hedge = factory
                .hedge_pricer(&choice.instrument)
                .and_then(|pricer| evaluator.substitute(pricer).ok());
            match hedge {
                Some(hedge) => {
                    plan.slots.push(Some(HedgeSlot {
                        tenor: choice.tenor,
                        index: plan.evaluators.len(),
                    }));
                    plan.evaluators.push(hedge);
                    plan.keys.push(key);
                }
                None => {
                    warn!(instrument = %choice.instrument.id, measure = %evaluator.measure(), "hedge instrument cannot be priced");
                    plan.slots.push(None);
                }
            }
        }
        plan
    }

    fn scaled(&self, difference: f64, width: f64) -> f64 {
        match (self.config.scale_delta, width > 0.0) {
            (false, _) => difference,
            (true, true) => difference / width,
            (true, false) => 0.0,
        }
    }

    fn category(&self, selection: &TenorSelection) -> String {
        self.config
            .category
            .clone()
            .unwrap_or_else(|| selection.category())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BumpType, HedgeTenor};
    use crate::error::{ConfigError, SensitivityError};
    use crate::parallel::ParallelConfig;
    use crate::test_support::{basis_curve, flat_curve, CountingModel, TestPricer};
    use approx::assert_relative_eq;
    use greeks_core::market_data::curves::{CurveHandle, CurveKind, HedgeInstrument};
    use greeks_core::traits::{BumpTarget, SharedModel};

    fn dyn_pricer(pricer: &Arc<TestPricer>) -> Arc<dyn Pricer> {
        pricer.clone()
    }

    fn quotes(curve: &CurveHandle) -> Vec<f64> {
        curve.read().tenors().iter().map(|t| t.quote()).collect()
    }

    // ========================================
    // Row structure
    // ========================================

    #[test]
    fn test_by_tenor_rows_and_restore() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0, 5.0], 0.01);
        ois.write().set_quote(1, 0.02).unwrap();
        ois.refit().unwrap();
        let swap = Arc::new(TestPricer::linear("swap", &ois, 1_000.0));

        let table = SensitivityCalculator::new(SensitivityConfig::default())
            .compute(&[dyn_pricer(&swap)], &[Measure::Pv])
            .unwrap();

        assert_eq!(table.len(), 2);
        for row in table.iter() {
            assert_eq!(row.category, "Discount");
            assert_eq!(row.element, "OIS");
            assert_relative_eq!(row.delta, 1_000.0, max_relative = 1e-9);
            assert!(row.gamma.is_none());
        }
        assert_eq!(table.rows()[0].tenor, "1Y");
        assert_eq!(table.rows()[1].tenor, "5Y");
        assert_eq!(quotes(&ois), vec![0.01, 0.02]);
    }

    #[test]
    fn test_unrelated_pricers_get_no_rows_except_uniform() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0, 2.0], 0.01);
        let eur = flat_curve("EUR", CurveKind::Discount, &[1.0, 3.0], 0.02);
        let usd_swap: Arc<dyn Pricer> = Arc::new(TestPricer::linear("usd", &ois, 1.0));
        let eur_swap: Arc<dyn Pricer> = Arc::new(TestPricer::linear("eur", &eur, 1.0));
        let pricers = [usd_swap, eur_swap];
        let measures = [Measure::Pv, Measure::Pv];

        let parallel = SensitivityCalculator::new(SensitivityConfig::new().with_bump_type(BumpType::Parallel))
            .compute(&pricers, &measures)
            .unwrap();
        assert_eq!(parallel.len(), 2);
        assert_eq!(parallel.rows()[0].pricer, "usd");
        assert_eq!(parallel.rows()[1].pricer, "eur");

        let uniform = SensitivityCalculator::new(SensitivityConfig::new().with_bump_type(BumpType::Uniform))
            .compute(&pricers, &measures)
            .unwrap();
        assert_eq!(uniform.len(), 2);
        assert!(uniform.iter().all(|r| r.element == "all" && r.tenor == "all"));
        assert_relative_eq!(uniform.rows()[0].delta, 2.0, max_relative = 1e-9);
    }

    #[test]
    fn test_prerequisite_bump_reaches_basis_pricer() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0, 5.0], 0.01);
        let basis = basis_curve("3M", &ois, &[1.0, 5.0], 0.001);
        let fra: Arc<dyn Pricer> = Arc::new(TestPricer::linear("fra", &basis, 1.0));

        let table = SensitivityCalculator::new(SensitivityConfig::new().with_bump_type(BumpType::Parallel))
            .compute(&[fra], &[Measure::Pv])
            .unwrap();
        // Only OIS is an interest-rate curve; the basis curve follows it.
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].element, "OIS");
        assert_relative_eq!(table.rows()[0].delta, 2.0, max_relative = 1e-9);
    }

    // ========================================
    // Formulas
    // ========================================

    #[test]
    fn test_scaled_and_unscaled_delta_gamma() {
        let q = 0.03;
        let (u, d) = (0.002, 0.001);
        let n = 50.0;
        let ois = flat_curve("OIS", CurveKind::Discount, &[2.0], q);
        let convex: Arc<dyn Pricer> = Arc::new(TestPricer::quadratic("convex", &ois, n));
        let f = |x: f64| n * x * x;

        let scaled = SensitivityCalculator::new(SensitivityConfig::new().with_bumps(u, d).with_gamma(true))
            .compute(&[convex.clone()], &[Measure::Pv])
            .unwrap();
        let row = &scaled.rows()[0];
        assert_relative_eq!(row.delta, (f(q + u) - f(q - d)) / (u + d), max_relative = 1e-9);
        assert_relative_eq!(
            row.gamma.unwrap(),
            (f(q + u) - 2.0 * f(q) + f(q - d)) / ((u + d) / 2.0),
            max_relative = 1e-6
        );

        let unscaled = SensitivityCalculator::new(
            SensitivityConfig::new()
                .with_bumps(u, d)
                .with_gamma(true)
                .with_scale_delta(false),
        )
        .compute(&[convex], &[Measure::Pv])
        .unwrap();
        let row = &unscaled.rows()[0];
        assert_relative_eq!(row.delta, f(q + u) - f(q - d), max_relative = 1e-9);
        assert_relative_eq!(row.gamma.unwrap(), f(q + u) - 2.0 * f(q) + f(q - d), max_relative = 1e-6);
    }

    #[test]
    fn test_one_sided_uses_base() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let swap: Arc<dyn Pricer> = Arc::new(TestPricer::linear("swap", &ois, 10.0));
        let table = SensitivityCalculator::new(SensitivityConfig::new().with_bumps(0.0001, 0.0))
            .compute(&[swap], &[Measure::Pv])
            .unwrap();
        assert_relative_eq!(table.rows()[0].delta, 10.0, max_relative = 1e-9);
    }

    #[test]
    fn test_zero_bumps_skip_evaluation() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0, 2.0], 0.01);
        let swap = Arc::new(TestPricer::linear("swap", &ois, 10.0));
        let before = ois.snapshot();
        let table = SensitivityCalculator::new(SensitivityConfig::new().with_bumps(0.0, 0.0).with_gamma(true))
            .compute(&[dyn_pricer(&swap)], &[Measure::Pv])
            .unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|r| r.delta == 0.0 && r.gamma == Some(0.0)));
        assert_eq!(swap.evaluations(), 1);
        assert!(ois.snapshot().same_bits(&before));
    }

    // ========================================
    // Hedging
    // ========================================

    #[test]
    fn test_hedge_notional() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0, 5.0], 0.01);
        let swap: Arc<dyn Pricer> = Arc::new(TestPricer::linear("swap", &ois, 10.0));
        let hedge_curve = ois.clone();
        let factory = move |instrument: &HedgeInstrument| -> Option<Arc<dyn Pricer>> {
            (instrument.id == "hedge-5Y")
                .then(|| Arc::new(TestPricer::linear("hedge", &hedge_curve, 4.0)) as Arc<dyn Pricer>)
        };

        let config = SensitivityConfig::new().with_hedge(HedgeTenor::All);
        let table = SensitivityCalculator::new(config)
            .compute_with_hedges(&[swap], &[Measure::Pv], &factory)
            .unwrap();

        let one = table.find("OIS", "1Y", "swap").unwrap();
        assert_eq!(one.hedge_tenor.as_deref(), Some(""));
        assert_eq!(one.hedge_notional, Some(0.0));

        let five = table.find("OIS", "5Y", "swap").unwrap();
        assert_eq!(five.hedge_tenor.as_deref(), Some("5Y"));
        assert_relative_eq!(five.hedge_delta.unwrap(), 4.0, max_relative = 1e-9);
        assert_relative_eq!(five.hedge_notional.unwrap(), 2.5, max_relative = 1e-9);
    }

    // ========================================
    // Errors and bookkeeping
    // ========================================

    #[test]
    fn test_config_errors_precede_mutation() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let swap = Arc::new(TestPricer::linear("swap", &ois, 1.0));
        let err = SensitivityCalculator::default()
            .compute(&[dyn_pricer(&swap)], &[])
            .unwrap_err();
        assert!(matches!(err, SensitivityError::Config(ConfigError::LengthMismatch { .. })));
        assert_eq!(swap.evaluations(), 0);

        let bad = SensitivityConfig::new()
            .with_targets(BumpTarget::INTEREST_RATE_BASIS)
            .with_flags(BumpFlags::BUMP_RELATIVE);
        let err = SensitivityCalculator::new(bad)
            .compute(&[dyn_pricer(&swap)], &[Measure::Pv])
            .unwrap_err();
        assert!(err.is_config());
        assert_eq!(swap.evaluations(), 0);
    }

    #[test]
    fn test_allow_missing_skips_pricer() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let a: Arc<dyn Pricer> = Arc::new(TestPricer::linear("a", &ois, 1.0));
        let b: Arc<dyn Pricer> = Arc::new(TestPricer::linear("b", &ois, 1.0));
        let config = SensitivityConfig::new().with_allow_missing(true);
        let table = SensitivityCalculator::new(config)
            .compute(&[a, b], &[Measure::Pv, Measure::ExpectedLoss])
            .unwrap();
        assert_eq!(table.pricers(), vec!["a"]);
    }

    #[test]
    fn test_pricing_failure_restores_and_reports_context() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0, 2.0], 0.01);
        let swap = Arc::new(TestPricer::linear("swap", &ois, 1.0));
        let before = ois.snapshot();
        let calculator = SensitivityCalculator::new(SensitivityConfig::default());

        swap.set_failing(true);
        let err = calculator.compute(&[dyn_pricer(&swap)], &[Measure::Pv]).unwrap_err();
        match err {
            SensitivityError::Pricing { selection, pricer, .. } => {
                assert_eq!(selection, "base");
                assert_eq!(pricer, "swap");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(ois.snapshot().same_bits(&before));
        swap.set_failing(false);
        assert!(calculator.compute(&[dyn_pricer(&swap)], &[Measure::Pv]).is_ok());
    }

    #[test]
    fn test_pricers_reset_after_run() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let swap = Arc::new(TestPricer::linear("swap", &ois, 1.0));
        SensitivityCalculator::default()
            .compute(&[dyn_pricer(&swap)], &[Measure::Pv])
            .unwrap();
        // base + up + down batches, plus the final reset
        assert_eq!(swap.resets(), 4);
        assert_eq!(swap.evaluations(), 3);
    }

    #[test]
    fn test_shared_model_prepared_once_per_batch() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0], 0.01);
        let model = Arc::new(CountingModel::new("basket"));
        let shared: Arc<dyn SharedModel> = model.clone();
        let pricers: Vec<Arc<dyn Pricer>> = (0..4)
            .map(|i| {
                Arc::new(TestPricer::linear(format!("tranche{}", i), &ois, 1.0).with_shared_model(shared.clone()))
                    as Arc<dyn Pricer>
            })
            .collect();
        let measures = vec![Measure::Pv; 4];
        let config = SensitivityConfig::new().with_parallel(ParallelConfig::new(1, 1));
        let table = SensitivityCalculator::new(config).compute(&pricers, &measures).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(model.prepares(), 3);
        assert_eq!(model.invalidations(), 3);
    }
}
