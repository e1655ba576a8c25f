//! The shift lifecycle and the market view shifts operate on.

use crate::error::{ConfigError, Result, SensitivityError};
use crate::evaluator::PricerEvaluator;
use crate::graph::DependencyGraph;
use greeks_core::market_data::curves::{CurveHandle, CurveState};
use greeks_core::traits::Pricer;
use std::fmt;
use std::sync::Arc;

/// What a shift did to the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftOutcome {
    /// A curve's default status changed.
    pub default_changed: bool,
}

impl ShiftOutcome {
    /// Outcome of a shift that left default status alone.
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Outcome of a shift that triggered or removed a default.
    pub fn default_changed() -> Self {
        Self {
            default_changed: true,
        }
    }
}

/// Pricers and curves of one scenario run.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioContext<'a> {
    scenario: &'a str,
    evaluators: &'a [PricerEvaluator],
    graph: &'a DependencyGraph,
}

impl<'a> ScenarioContext<'a> {
    /// Context over `evaluators` and the full graph of the curves they read.
    pub fn new(scenario: &'a str, evaluators: &'a [PricerEvaluator], graph: &'a DependencyGraph) -> Self {
        Self {
            scenario,
            evaluators,
            graph,
        }
    }

    /// Scenario name.
    pub fn scenario(&self) -> &'a str {
        self.scenario
    }

    /// Evaluators of the run.
    pub fn evaluators(&self) -> &'a [PricerEvaluator] {
        self.evaluators
    }

    /// Curves read by the evaluators, with their prerequisites.
    pub fn graph(&self) -> &'a DependencyGraph {
        self.graph
    }

    /// Curve with the given name.
    pub fn curve(&self, name: &str) -> Option<&'a CurveHandle> {
        self.graph.curves().iter().find(|c| c.name() == name)
    }

    /// Distinct pricers; a pricer wrapped for several measures appears once.
    pub fn pricers(&self) -> Vec<Arc<dyn Pricer>> {
        let mut pricers: Vec<Arc<dyn Pricer>> = Vec::new();
        for evaluator in self.evaluators {
            let pricer = evaluator.pricer();
            if !pricers.iter().any(|p| same_pricer(p, pricer)) {
                pricers.push(pricer.clone());
            }
        }
        pricers
    }

    /// `curves` and everything derived from them, in topological order.
    pub fn with_dependents(&self, curves: &[CurveHandle]) -> Vec<CurveHandle> {
        let ids: Vec<_> = curves.iter().map(CurveHandle::id).collect();
        let mut all = curves.to_vec();
        all.extend(self.graph.dependents_of(&ids));
        all.sort_by_key(|c| self.graph.position(c.id()).unwrap_or(usize::MAX));
        all.dedup_by_key(|c| c.id());
        all
    }

    /// Refits `curves` in order.
    pub fn refit(&self, curves: &[CurveHandle]) -> Result<()> {
        for curve in curves {
            curve.refit().map_err(|source| SensitivityError::Calibration {
                selection: self.scenario.to_string(),
                curve: curve.name().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Error raised by `shift` outside calibration and pricing.
    pub fn error(&self, shift: &str, reason: impl Into<String>) -> SensitivityError {
        SensitivityError::Scenario {
            scenario: self.scenario.to_string(),
            shift: shift.to_string(),
            reason: reason.into(),
        }
    }
}

fn same_pricer(a: &Arc<dyn Pricer>, b: &Arc<dyn Pricer>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// One step of a scenario.
///
/// The composer calls `validate` on every shift before touching anything,
/// then `save_state`, `perform_shift` and `perform_refit` on every shift in
/// list order, and finally `restore_state` on every shift in reverse order,
/// whatever happened before. `restore_state` must therefore be a no-op when
/// nothing was saved.
pub trait ScenarioShift: Send + Sync + fmt::Debug {
    /// Label used in errors and logs.
    fn name(&self) -> &str;

    /// Checks parameters without side effects.
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        Ok(())
    }

    /// Records whatever `restore_state` needs.
    fn save_state(&mut self, context: &ScenarioContext<'_>) -> Result<()>;

    /// Moves the market.
    fn perform_shift(&mut self, context: &ScenarioContext<'_>) -> Result<ShiftOutcome>;

    /// Recalibrates what the shift touched, once every shift has been applied.
    fn perform_refit(&mut self, _context: &ScenarioContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Puts back the saved state and forgets it.
    fn restore_state(&mut self, context: &ScenarioContext<'_>);
}

/// Saved curve states, restored last saved first.
#[derive(Debug, Default)]
pub(crate) struct SavedCurves {
    saved: Vec<(CurveHandle, CurveState)>,
}

impl SavedCurves {
    pub(crate) fn save(&mut self, curves: &[CurveHandle]) {
        self.saved = curves.iter().map(|c| (c.clone(), c.snapshot())).collect();
    }

    pub(crate) fn restore(&mut self) {
        for (curve, state) in self.saved.drain(..).rev() {
            curve.restore(state);
        }
    }
}
